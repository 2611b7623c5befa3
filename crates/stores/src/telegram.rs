use anyhow::Context;
use motion::{EventStore, PotholeRecord};
use serde::Deserialize;
use teloxide::{
	prelude::*,
	types::{MessageId, ParseMode, ThreadId},
};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
	pub bot_token: String,
	pub chat_id: String,
	pub thread_id: Option<i32>,
}

/// Posts every report to a chat (or forum thread) instead of a database.
#[derive(Clone)]
pub struct TelegramStore {
	bot: Bot,
	config: TelegramConfig,
}

impl TelegramStore {
	pub fn new(config: TelegramConfig) -> Self {
		let bot = Bot::new(&config.bot_token);

		Self { bot, config }
	}

	pub async fn test_connection(&self) -> anyhow::Result<()> {
		let me = self.bot.get_me().await.context("Failed to reach Telegram")?;
		info!(bot = %me.username(), "Telegram bot connected");
		Ok(())
	}

	fn format_report(&self, record: &PotholeRecord) -> String {
		let PotholeRecord { latitude, longitude, peak_vertical, detected_at, .. } = record;

		let header = "🕳 <b>Pothole detected</b>";
		let location = format!("📍 <code>{latitude:.6}, {longitude:.6}</code>");
		let stats = format!(
			"📈 Peak vertical: <code>{peak_vertical:.1} m/s²</code>\n\
			🕒 {}",
			detected_at.format("%Y-%m-%d %H:%M:%S UTC")
		);
		let link = format!(r#"🗺 <a href="https://maps.google.com/?q={latitude},{longitude}">Open map</a>"#);

		[header.to_string(), location, stats, link].join("\n\n")
	}
}

#[async_trait::async_trait]
impl EventStore for TelegramStore {
	fn name(&self) -> &'static str {
		"telegram"
	}

	async fn append(&self, record: &PotholeRecord) -> anyhow::Result<()> {
		let chat_id = self.config.chat_id.parse::<i64>().context("Invalid chat_id format")?;
		let text = self.format_report(record);

		let mut request = self.bot.send_message(ChatId(chat_id), text).parse_mode(ParseMode::Html);

		if let Some(thread_id) = self.config.thread_id {
			request = request.message_thread_id(ThreadId(MessageId(thread_id)));
		}

		request.await.map_err(|error| anyhow::anyhow!("Failed to send pothole report: {error}"))?;

		Ok(())
	}
}
