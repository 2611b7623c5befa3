use anyhow::Context;
use futures_util::{StreamExt, stream};
use motion::{
	Acceleration, Position, PositionSource, PositionStream, RawOrientation, SampleSource, SampleStream, SensorSample,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::config::SensorConfig;

/// JSON text frames pushed by the host app.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum FeedMessage {
	Orientation {
		timestamp_ns: u64,
		x: f64,
		y: f64,
		z: f64,
		#[serde(default)]
		w: Option<f64>,
	},
	Acceleration {
		timestamp_ns: u64,
		x: f64,
		y: f64,
		z: f64,
	},
	Location {
		latitude: f64,
		longitude: f64,
	},
}

impl FeedMessage {
	fn into_sample(self) -> Option<SensorSample> {
		match self {
			Self::Orientation { timestamp_ns, x, y, z, w } => {
				Some(SensorSample::orientation(timestamp_ns, RawOrientation { x, y, z, w }))
			},
			Self::Acceleration { timestamp_ns, x, y, z } => {
				Some(SensorSample::acceleration(timestamp_ns, Acceleration::new(x, y, z)))
			},
			Self::Location { .. } => None,
		}
	}

	fn into_position(self) -> Option<Position> {
		match self {
			Self::Location { latitude, longitude } => Some(Position::new(latitude, longitude)),
			_ => None,
		}
	}
}

/// WebSocket client for the host's sensor feed.
///
/// Each subscription holds its own connection, reconnecting with exponential backoff, and is
/// torn down as soon as the subscriber drops its stream.
pub struct SensorFeed {
	config: SensorConfig,
}

impl SensorFeed {
	pub const fn new(config: SensorConfig) -> Self {
		Self { config }
	}

	fn spawn<T: Send + 'static>(&self, label: &'static str, pick: fn(FeedMessage) -> Option<T>) -> mpsc::Receiver<T> {
		let (tx, rx) = mpsc::channel(self.config.channel_size);
		let config = self.config.clone();

		tokio::spawn(async move { connect_feed(config, label, pick, tx).await });

		rx
	}
}

#[async_trait::async_trait]
impl SampleSource for SensorFeed {
	async fn subscribe(&self) -> anyhow::Result<SampleStream> {
		let mut rx = self.spawn("sample", FeedMessage::into_sample);
		Ok(Box::pin(stream::poll_fn(move |cx| rx.poll_recv(cx))))
	}
}

#[async_trait::async_trait]
impl PositionSource for SensorFeed {
	async fn subscribe(&self) -> anyhow::Result<PositionStream> {
		let mut rx = self.spawn("position", FeedMessage::into_position);
		Ok(Box::pin(stream::poll_fn(move |cx| rx.poll_recv(cx))))
	}
}

/// Reconnect delay that doubles on every failed attempt up to a cap.
#[derive(Debug)]
struct Backoff {
	base_secs: u64,
	max_secs: u64,
	current_secs: u64,
}

impl Backoff {
	const fn new(base_secs: u64, max_secs: u64) -> Self {
		Self { base_secs, max_secs, current_secs: base_secs }
	}

	fn next_delay(&mut self) -> u64 {
		let delay = self.current_secs;
		self.current_secs = (self.current_secs * 2).min(self.max_secs);
		delay
	}

	const fn reset(&mut self) {
		self.current_secs = self.base_secs;
	}
}

async fn connect_feed<T>(
	config: SensorConfig,
	label: &'static str,
	pick: fn(FeedMessage) -> Option<T>,
	tx: mpsc::Sender<T>,
) {
	info!("Connecting {} feed: {}", label, config.ws_url);

	let mut backoff = Backoff::new(config.reconnect_base_delay_secs, config.reconnect_max_delay_secs);

	loop {
		let result = run_feed(&config.ws_url, label, pick, &tx, &mut backoff).await;
		let reconnect_delay = backoff.next_delay();

		match result {
			Ok(()) if tx.is_closed() => {
				info!("{} feed unsubscribed", label);
				break;
			},
			Ok(()) => warn!("{} feed closed by host. Reconnecting in {}s...", label, reconnect_delay),
			Err(e) => error!("{} feed error: {:#}. Reconnecting in {}s...", label, e, reconnect_delay),
		}

		tokio::select! {
			() = sleep(Duration::from_secs(reconnect_delay)) => {},
			() = tx.closed() => break,
		}
	}
}

async fn run_feed<T>(
	url: &str,
	label: &'static str,
	pick: fn(FeedMessage) -> Option<T>,
	tx: &mpsc::Sender<T>,
	backoff: &mut Backoff,
) -> anyhow::Result<()> {
	let (mut ws_stream, _) = connect_async(url).await.with_context(|| format!("Failed to connect to {label} feed"))?;

	backoff.reset();
	info!("Connected to {} feed", label);

	loop {
		let msg = tokio::select! {
			msg = ws_stream.next() => msg,
			() = tx.closed() => return Ok(()),
		};

		let Some(msg) = msg else {
			return Ok(());
		};

		match msg.with_context(|| format!("Error reading from {label} feed"))? {
			Message::Text(text) => match parse_message(&text) {
				Ok(message) => {
					if let Some(item) = pick(message)
						&& tx.send(item).await.is_err()
					{
						return Ok(());
					}
				},
				Err(e) => warn!("Failed to parse {} message: {}", label, e),
			},
			Message::Close(_) => {
				info!("Received close message from {} feed", label);
				return Ok(());
			},
			Message::Ping(_) | Message::Pong(_) => debug!("Keepalive on {} feed", label),
			_ => {},
		}
	}
}

fn parse_message(text: &str) -> anyhow::Result<FeedMessage> {
	serde_json::from_str(text).context("Failed to parse feed message")
}
