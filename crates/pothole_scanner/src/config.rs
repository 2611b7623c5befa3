use std::fs;
use std::time::Duration;

use anyhow::Context;
use motion::{DEFAULT_POSITION, DEFAULT_QUIET_PERIOD, DEFAULT_VERTICAL_THRESHOLD, DebounceConfig, MonitorConfig, Position};
use serde::Deserialize;
use stores::{FirestoreConfig, TelegramConfig};
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub detection: DetectionConfig,
	#[serde(default)]
	pub position: PositionConfig,
	pub sensor: SensorConfig,
	pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
	pub vertical_threshold: f64,
	pub quiet_period_ms: u64,
}

impl Default for DetectionConfig {
	fn default() -> Self {
		Self {
			vertical_threshold: DEFAULT_VERTICAL_THRESHOLD,
			quiet_period_ms: DEFAULT_QUIET_PERIOD.as_millis() as u64,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionConfig {
	pub default_latitude: f64,
	pub default_longitude: f64,
}

impl Default for PositionConfig {
	fn default() -> Self {
		Self { default_latitude: DEFAULT_POSITION.latitude, default_longitude: DEFAULT_POSITION.longitude }
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
	pub ws_url: String,
	#[serde(default = "default_reconnect_base_delay_secs")]
	pub reconnect_base_delay_secs: u64,
	#[serde(default = "default_reconnect_max_delay_secs")]
	pub reconnect_max_delay_secs: u64,
	#[serde(default = "default_channel_size")]
	pub channel_size: usize,
}

const fn default_reconnect_base_delay_secs() -> u64 {
	1
}

const fn default_reconnect_max_delay_secs() -> u64 {
	30
}

const fn default_channel_size() -> usize {
	1024
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
	Firestore(FirestoreConfig),
	Telegram(TelegramConfig),
}

impl Config {
	pub fn load(path: &str) -> anyhow::Result<Self> {
		let content = fs::read_to_string(path).with_context(|| format!("Failed to read config file: {path}"))?;

		Self::parse(&content)
	}

	pub fn parse(content: &str) -> anyhow::Result<Self> {
		let config: Self = toml::from_str(content).context("Failed to parse config file")?;

		config.validate()?;

		Ok(config)
	}

	fn validate(&self) -> anyhow::Result<()> {
		if !self.detection.vertical_threshold.is_finite() || self.detection.vertical_threshold <= 0.0 {
			anyhow::bail!("detection.vertical_threshold must be a positive number");
		}

		if self.detection.quiet_period_ms == 0 {
			anyhow::bail!("detection.quiet_period_ms must be greater than 0");
		}

		if !(-90.0..=90.0).contains(&self.position.default_latitude) {
			anyhow::bail!("position.default_latitude must be between -90 and 90");
		}

		if !(-180.0..=180.0).contains(&self.position.default_longitude) {
			anyhow::bail!("position.default_longitude must be between -180 and 180");
		}

		let ws_url = Url::parse(&self.sensor.ws_url).context("sensor.ws_url is not a valid URL")?;
		if !matches!(ws_url.scheme(), "ws" | "wss") {
			anyhow::bail!("sensor.ws_url must use ws:// or wss://");
		}

		if self.sensor.reconnect_base_delay_secs == 0
			|| self.sensor.reconnect_base_delay_secs > self.sensor.reconnect_max_delay_secs
		{
			anyhow::bail!("sensor reconnect delays must satisfy 0 < base <= max");
		}

		if self.sensor.channel_size == 0 {
			anyhow::bail!("sensor.channel_size must be greater than 0");
		}

		match &self.store {
			StoreConfig::Firestore(firestore) => {
				if firestore.project_id.is_empty() || firestore.project_id == "YOUR_PROJECT_ID_HERE" {
					anyhow::bail!("Please set a valid Firestore project_id in config.toml");
				}

				Url::parse(&firestore.base_url).context("store.base_url is not a valid URL")?;
			},
			StoreConfig::Telegram(telegram) => {
				if telegram.bot_token == "YOUR_BOT_TOKEN_HERE" {
					anyhow::bail!("Please set a valid Telegram bot token in config.toml");
				}

				if telegram.chat_id.parse::<i64>().is_err() {
					anyhow::bail!("Please set a valid numeric Telegram chat ID in config.toml");
				}
			},
		}

		Ok(())
	}

	pub const fn monitor_config(&self) -> MonitorConfig {
		MonitorConfig {
			debounce: DebounceConfig {
				threshold: self.detection.vertical_threshold,
				quiet_period: Duration::from_millis(self.detection.quiet_period_ms),
			},
			default_position: Position::new(self.position.default_latitude, self.position.default_longitude),
		}
	}
}
