use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::debug;

use crate::types::{Acceleration, DetectionEvent};

pub const DEFAULT_VERTICAL_THRESHOLD: f64 = 25.0;
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebounceConfig {
	/// World-frame vertical acceleration (m/s²) a sample must strictly exceed.
	pub threshold: f64,
	/// Inactivity needed to close an open window.
	pub quiet_period: Duration,
}

impl Default for DebounceConfig {
	fn default() -> Self {
		Self { threshold: DEFAULT_VERTICAL_THRESHOLD, quiet_period: DEFAULT_QUIET_PERIOD }
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionWindow {
	pub peak: Acceleration,
	pub deadline: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DebounceState {
	#[default]
	Idle,
	Accumulating(DetectionWindow),
}

/// Trailing-edge debouncer over world-frame samples.
///
/// Every qualifying sample pushes the deadline out by the quiet period, so a rough patch of
/// road yields one event carrying its strongest jolt. Non-qualifying samples are ignored.
#[derive(Debug)]
pub struct ThresholdDebouncer {
	config: DebounceConfig,
	state: DebounceState,
}

impl ThresholdDebouncer {
	#[must_use]
	pub fn new(config: DebounceConfig) -> Self {
		Self { config, state: DebounceState::Idle }
	}

	#[must_use]
	pub fn qualifies(&self, sample: &Acceleration) -> bool {
		sample.z > self.config.threshold
	}

	/// Feeds one world-frame sample. Returns `true` when it qualified and (re)armed the deadline.
	pub fn on_sample(&mut self, sample: Acceleration, now: Instant) -> bool {
		if !self.qualifies(&sample) {
			return false;
		}

		let deadline = now + self.config.quiet_period;

		self.state = match self.state {
			DebounceState::Idle => {
				debug!(z = sample.z, "Detection window opened");
				DebounceState::Accumulating(DetectionWindow { peak: sample, deadline })
			},
			DebounceState::Accumulating(window) => {
				let peak = if window.peak.z < sample.z { sample } else { window.peak };
				DebounceState::Accumulating(DetectionWindow { peak, deadline })
			},
		};

		true
	}

	/// Closes the window if its deadline has passed at `now`.
	pub fn on_deadline(&mut self, now: Instant) -> Option<DetectionEvent> {
		match self.state {
			DebounceState::Accumulating(window) if now >= window.deadline => {
				self.state = DebounceState::Idle;
				debug!(z = window.peak.z, "Detection window closed");
				Some(DetectionEvent { peak: window.peak, detected_at: Utc::now() })
			},
			_ => None,
		}
	}

	/// Drops any open window without emitting.
	pub fn discard(&mut self) -> Option<DetectionWindow> {
		match std::mem::take(&mut self.state) {
			DebounceState::Accumulating(window) => Some(window),
			DebounceState::Idle => None,
		}
	}

	#[must_use]
	pub const fn deadline(&self) -> Option<Instant> {
		match self.state {
			DebounceState::Accumulating(window) => Some(window.deadline),
			DebounceState::Idle => None,
		}
	}

	#[must_use]
	pub const fn state(&self) -> &DebounceState {
		&self.state
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const QUIET: Duration = Duration::from_secs(5);

	fn debouncer() -> ThresholdDebouncer {
		ThresholdDebouncer::new(DebounceConfig { threshold: 25.0, quiet_period: QUIET })
	}

	fn vertical(z: f64) -> Acceleration {
		Acceleration::new(0.0, 0.0, z)
	}

	/// Feeds `(offset, z)` samples and drains the window at each sample's time, like the monitor loop.
	fn run(samples: &[(Duration, f64)], end: Duration) -> Vec<DetectionEvent> {
		let start = Instant::now();
		let mut debouncer = debouncer();
		let mut events = Vec::new();

		for &(offset, z) in samples {
			let now = start + offset;
			if let Some(deadline) = debouncer.deadline()
				&& deadline <= now
				&& let Some(event) = debouncer.on_deadline(deadline)
			{
				events.push(event);
			}
			debouncer.on_sample(vertical(z), now);
		}

		events.extend(debouncer.on_deadline(start + end));
		events
	}

	#[test]
	fn threshold_is_strict() {
		let debouncer = debouncer();
		assert!(!debouncer.qualifies(&vertical(25.0)));
		assert!(debouncer.qualifies(&vertical(25.0001)));
	}

	#[test]
	fn single_sample_yields_one_event() {
		let events = run(&[(Duration::ZERO, 30.0)], QUIET);

		assert_eq!(events.len(), 1);
		assert_eq!(events[0].peak, vertical(30.0));
	}

	#[test]
	fn window_stays_open_before_deadline() {
		let start = Instant::now();
		let mut debouncer = debouncer();

		debouncer.on_sample(vertical(30.0), start);

		assert!(debouncer.on_deadline(start + QUIET - Duration::from_millis(1)).is_none());
		assert!(debouncer.on_deadline(start + QUIET).is_some());
		assert_eq!(debouncer.state(), &DebounceState::Idle);
	}

	#[test]
	fn burst_keeps_maximum_in_any_order() {
		let orders = [[30.0, 45.0, 38.0], [45.0, 30.0, 38.0], [38.0, 30.0, 45.0], [30.0, 38.0, 45.0]];

		for order in orders {
			let samples: Vec<_> =
				order.iter().enumerate().map(|(i, &z)| (Duration::from_secs(i as u64), z)).collect();
			let events = run(&samples, Duration::from_secs(2) + QUIET);

			assert_eq!(events.len(), 1, "order {order:?}");
			assert_eq!(events[0].peak.z, 45.0, "order {order:?}");
		}
	}

	#[test]
	fn qualifying_sample_pushes_deadline() {
		let start = Instant::now();
		let mut debouncer = debouncer();

		debouncer.on_sample(vertical(30.0), start);
		debouncer.on_sample(vertical(26.0), start + Duration::from_secs(4));

		assert_eq!(debouncer.deadline(), Some(start + Duration::from_secs(4) + QUIET));
		assert!(debouncer.on_deadline(start + QUIET).is_none());
	}

	#[test]
	fn separated_samples_yield_two_events() {
		let events = run(&[(Duration::ZERO, 30.0), (QUIET + Duration::from_secs(1), 40.0)], QUIET * 3);

		assert_eq!(events.len(), 2);
		assert_eq!(events[0].peak.z, 30.0);
		assert_eq!(events[1].peak.z, 40.0);
	}

	#[test]
	fn quiet_sample_neither_splits_nor_changes_peak() {
		let start = Instant::now();
		let mut debouncer = debouncer();

		debouncer.on_sample(vertical(30.0), start);
		let before = debouncer.deadline();
		assert!(!debouncer.on_sample(vertical(10.0), start + Duration::from_secs(3)));
		assert_eq!(debouncer.deadline(), before);

		let events = run(
			&[(Duration::ZERO, 30.0), (Duration::from_secs(3), 25.0), (Duration::from_secs(4), 28.0)],
			Duration::from_secs(4) + QUIET,
		);
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].peak.z, 30.0);
	}

	#[test]
	fn ties_keep_existing_peak() {
		let start = Instant::now();
		let mut debouncer = debouncer();

		debouncer.on_sample(Acceleration::new(1.0, 0.0, 30.0), start);
		debouncer.on_sample(Acceleration::new(2.0, 0.0, 30.0), start + Duration::from_secs(1));

		let event = debouncer.on_deadline(start + Duration::from_secs(1) + QUIET);
		assert_eq!(event.map(|e| e.peak.x), Some(1.0));
	}

	#[test]
	fn discard_drops_open_window() {
		let start = Instant::now();
		let mut debouncer = debouncer();

		debouncer.on_sample(vertical(30.0), start);
		assert!(debouncer.discard().is_some());
		assert!(debouncer.on_deadline(start + QUIET).is_none());
		assert!(debouncer.discard().is_none());
	}
}
