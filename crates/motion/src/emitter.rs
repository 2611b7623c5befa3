use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::info;

use crate::EventStore;
use crate::types::{DetectionEvent, Position, PotholeRecord};

/// Used when no position has ever been received.
pub const DEFAULT_POSITION: Position = Position::new(41.994_293, 21.418_497);

/// Packages closed windows into records and hands them to the store, once, without retrying.
#[derive(Clone)]
pub struct EventEmitter {
	store: Arc<dyn EventStore>,
	default_position: Position,
}

impl EventEmitter {
	pub fn new(store: Arc<dyn EventStore>, default_position: Position) -> Self {
		Self { store, default_position }
	}

	pub async fn emit(&self, event: DetectionEvent, position: Option<Position>) -> anyhow::Result<PotholeRecord> {
		let record = self.package(event, position);

		self.store
			.append(&record)
			.await
			.with_context(|| format!("Failed to publish pothole to {} store", self.store.name()))?;

		info!(
			latitude = record.latitude,
			longitude = record.longitude,
			peak_vertical = record.peak_vertical,
			store = self.store.name(),
			"Pothole reported"
		);

		Ok(record)
	}

	#[must_use]
	pub fn package(&self, event: DetectionEvent, position: Option<Position>) -> PotholeRecord {
		let Position { latitude, longitude } = position.unwrap_or(self.default_position);

		PotholeRecord {
			latitude,
			longitude,
			peak_vertical: event.peak.z,
			detected_at: event.detected_at,
			reported_at: Utc::now(),
		}
	}
}
