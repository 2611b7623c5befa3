use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

use crate::debouncer::{DebounceConfig, ThresholdDebouncer};
use crate::emitter::{DEFAULT_POSITION, EventEmitter};
use crate::frame::transform;
use crate::orientation::OrientationTracker;
use crate::types::{Position, PotholeRecord, SampleKind, SensorSample};
use crate::{EventStore, PositionSource, PositionStream, SampleSource, SampleStream};

pub type ReportOutcome = anyhow::Result<PotholeRecord>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
	pub debounce: DebounceConfig,
	pub default_position: Position,
}

impl Default for MonitorConfig {
	fn default() -> Self {
		Self { debounce: DebounceConfig::default(), default_position: DEFAULT_POSITION }
	}
}

/// The detection pipeline: orientation tracking, frame transform, debouncing and emission.
///
/// All pipeline state lives inside one task. Samples, positions, the debounce deadline and
/// finished publishes are branches of a single biased select, with samples polled ahead of
/// the deadline so a fresh qualifying sample always lands before an expiry in the same turn.
pub struct Monitor {
	tracker: OrientationTracker,
	debouncer: ThresholdDebouncer,
	emitter: EventEmitter,
	position: Option<Position>,
	publishes: JoinSet<ReportOutcome>,
	outcomes: mpsc::UnboundedSender<ReportOutcome>,
	dropped_samples: u64,
}

pub struct MonitorHandle {
	stop: oneshot::Sender<()>,
	task: JoinHandle<()>,
	active: Arc<AtomicBool>,
	outcomes: mpsc::UnboundedReceiver<ReportOutcome>,
}

impl Monitor {
	/// Subscribes to both sources and starts detecting in the idle state.
	pub async fn start(
		config: MonitorConfig,
		sample_source: &dyn SampleSource,
		position_source: &dyn PositionSource,
		store: Arc<dyn EventStore>,
	) -> anyhow::Result<MonitorHandle> {
		let samples = sample_source.subscribe().await.context("Failed to subscribe to sensor samples")?;
		let positions = position_source.subscribe().await.context("Failed to subscribe to position updates")?;

		let (stop_tx, stop_rx) = oneshot::channel();
		let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
		let active = Arc::new(AtomicBool::new(true));

		let monitor = Self {
			tracker: OrientationTracker::new(),
			debouncer: ThresholdDebouncer::new(config.debounce),
			emitter: EventEmitter::new(store, config.default_position),
			position: None,
			publishes: JoinSet::new(),
			outcomes: outcomes_tx,
			dropped_samples: 0,
		};

		let task = tokio::spawn(monitor.run(samples, positions, stop_rx, Arc::clone(&active)));

		info!(
			threshold = config.debounce.threshold,
			quiet_period_ms = config.debounce.quiet_period.as_millis(),
			"Monitoring started"
		);

		Ok(MonitorHandle { stop: stop_tx, task, active, outcomes: outcomes_rx })
	}

	async fn run(
		mut self,
		mut samples: SampleStream,
		mut positions: PositionStream,
		mut stop: oneshot::Receiver<()>,
		active: Arc<AtomicBool>,
	) {
		let mut positions_open = true;

		loop {
			let deadline = self.debouncer.deadline();

			tokio::select! {
				biased;

				_ = &mut stop => {
					debug!("Stop requested");
					break;
				},
				sample = samples.next() => match sample {
					Some(sample) => self.on_sample(sample),
					None => {
						warn!("Sample source closed, monitoring ends");
						break;
					},
				},
				position = positions.next(), if positions_open => match position {
					Some(position) => self.position = Some(position),
					None => {
						debug!("Position source closed, keeping last known position");
						positions_open = false;
					},
				},
				() = wait_until(deadline) => self.on_deadline(),
				Some(joined) = self.publishes.join_next() => self.on_published(joined),
			}
		}

		active.store(false, Ordering::SeqCst);

		if let Some(window) = self.debouncer.discard() {
			info!(peak_vertical = window.peak.z, "Discarded open detection window");
		}

		// Reports already handed to the store are allowed to land.
		self.publishes.detach_all();
	}

	fn on_sample(&mut self, sample: SensorSample) {
		match sample.kind {
			SampleKind::Orientation(orientation) => {
				self.tracker.update_orientation(orientation);
			},
			SampleKind::Acceleration(acceleration) => {
				let Some(rotation) = self.tracker.current() else {
					self.dropped_samples += 1;
					if self.dropped_samples == 1 {
						debug!("No orientation yet, dropping acceleration samples");
					}
					return;
				};

				let world = transform(&rotation, &acceleration);
				if self.debouncer.on_sample(world, Instant::now()) {
					debug!(timestamp_ns = sample.timestamp_ns, z = world.z, "Qualifying sample");
				}
			},
		}
	}

	fn on_deadline(&mut self) {
		let Some(event) = self.debouncer.on_deadline(Instant::now()) else {
			return;
		};

		let emitter = self.emitter.clone();
		let position = self.position;

		self.publishes.spawn(async move { emitter.emit(event, position).await });
	}

	fn on_published(&self, joined: Result<ReportOutcome, JoinError>) {
		let outcome = joined.unwrap_or_else(|e| Err(anyhow::Error::new(e).context("Publish task failed")));

		if let Err(e) = &outcome {
			error!("Failed to report pothole: {e:#}");
		}

		// The owner may not be listening.
		let _ = self.outcomes.send(outcome);
	}
}

impl MonitorHandle {
	#[must_use]
	pub fn is_active(&self) -> bool {
		self.active.load(Ordering::SeqCst)
	}

	/// Next publish result, `None` once monitoring has ended and all results were drained.
	pub async fn next_outcome(&mut self) -> Option<ReportOutcome> {
		self.outcomes.recv().await
	}

	/// Unsubscribes from both sources and drops any open window without reporting it.
	pub async fn stop(self) -> anyhow::Result<()> {
		let _ = self.stop.send(());
		self.task.await.context("Monitor task failed")?;

		info!("Monitoring stopped");
		Ok(())
	}
}

async fn wait_until(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => sleep_until(deadline).await,
		None => std::future::pending().await,
	}
}
