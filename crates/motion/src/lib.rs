mod channel;
mod debouncer;
mod emitter;
mod frame;
mod monitor;
mod orientation;
mod types;

use std::pin::Pin;

use futures_util::stream::Stream;

pub use channel::{ChannelSource, ChannelSourceSender};
pub use debouncer::{
	DEFAULT_QUIET_PERIOD, DEFAULT_VERTICAL_THRESHOLD, DebounceConfig, DebounceState, DetectionWindow, ThresholdDebouncer,
};
pub use emitter::{DEFAULT_POSITION, EventEmitter};
pub use frame::transform;
pub use monitor::{Monitor, MonitorConfig, MonitorHandle, ReportOutcome};
pub use orientation::{OrientationTracker, rotation_from_vector};
pub use types::*;

pub type SampleStream = Pin<Box<dyn Stream<Item = SensorSample> + Send>>;
pub type PositionStream = Pin<Box<dyn Stream<Item = Position> + Send>>;

/// Host inertial sensors. Subscribing registers for both sample kinds; dropping the stream deregisters.
#[async_trait::async_trait]
pub trait SampleSource: Send + Sync {
	async fn subscribe(&self) -> anyhow::Result<SampleStream>;
}

/// Host positioning. Only the latest yielded position matters.
#[async_trait::async_trait]
pub trait PositionSource: Send + Sync {
	async fn subscribe(&self) -> anyhow::Result<PositionStream>;
}

/// Durable, shared collection of reported potholes. Append-only from our side.
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
	fn name(&self) -> &'static str;

	async fn append(&self, record: &PotholeRecord) -> anyhow::Result<()>;
}
