use anyhow::anyhow;
use futures_util::stream;
use tokio::sync::{Mutex, mpsc};

use crate::types::{Position, SensorSample};
use crate::{PositionSource, PositionStream, SampleSource, SampleStream};

/// In-process source for hosts that push samples themselves. Each side can be subscribed once.
pub struct ChannelSource {
	samples: Mutex<Option<mpsc::Receiver<SensorSample>>>,
	positions: Mutex<Option<mpsc::Receiver<Position>>>,
}

#[derive(Clone)]
pub struct ChannelSourceSender {
	pub samples: mpsc::Sender<SensorSample>,
	pub positions: mpsc::Sender<Position>,
}

impl ChannelSource {
	#[must_use]
	pub fn new(capacity: usize) -> (Self, ChannelSourceSender) {
		let (samples_tx, samples_rx) = mpsc::channel(capacity);
		let (positions_tx, positions_rx) = mpsc::channel(capacity);

		let source = Self { samples: Mutex::new(Some(samples_rx)), positions: Mutex::new(Some(positions_rx)) };

		(source, ChannelSourceSender { samples: samples_tx, positions: positions_tx })
	}
}

#[async_trait::async_trait]
impl SampleSource for ChannelSource {
	async fn subscribe(&self) -> anyhow::Result<SampleStream> {
		let mut rx = self.samples.lock().await.take().ok_or_else(|| anyhow!("Sample channel already subscribed"))?;

		Ok(Box::pin(stream::poll_fn(move |cx| rx.poll_recv(cx))))
	}
}

#[async_trait::async_trait]
impl PositionSource for ChannelSource {
	async fn subscribe(&self) -> anyhow::Result<PositionStream> {
		let mut rx =
			self.positions.lock().await.take().ok_or_else(|| anyhow!("Position channel already subscribed"))?;

		Ok(Box::pin(stream::poll_fn(move |cx| rx.poll_recv(cx))))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures_util::StreamExt;

	#[tokio::test]
	async fn forwards_samples_and_rejects_second_subscription() {
		let (source, sender) = ChannelSource::new(4);
		let mut samples = SampleSource::subscribe(&source).await.unwrap();

		sender.samples.send(SensorSample::acceleration(1, crate::Acceleration::new(0.0, 0.0, 1.0))).await.unwrap();
		assert_eq!(samples.next().await.map(|s| s.timestamp_ns), Some(1));

		assert!(SampleSource::subscribe(&source).await.is_err());
		assert!(PositionSource::subscribe(&source).await.is_ok());
	}

	#[tokio::test]
	async fn stream_ends_when_sender_dropped() {
		let (source, sender) = ChannelSource::new(4);
		let mut positions = PositionSource::subscribe(&source).await.unwrap();

		sender.positions.send(Position::new(1.0, 2.0)).await.unwrap();
		drop(sender);

		assert_eq!(positions.next().await, Some(Position::new(1.0, 2.0)));
		assert_eq!(positions.next().await, None);
	}
}
