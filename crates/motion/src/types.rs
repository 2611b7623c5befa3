use chrono::{DateTime, Utc};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Device-to-world rotation, orthonormal as delivered by the platform's sensor fusion.
pub type RotationMatrix = Matrix3<f64>;

/// Acceleration in m/s², either device frame or world frame depending on where it came from.
pub type Acceleration = Vector3<f64>;

/// Rotation vector as reported by the platform attitude sensor.
///
/// `x`, `y`, `z` are the vector part of a unit quaternion (`axis * sin(θ/2)`). Some sensors
/// also report the scalar part `w`; when they don't it is recovered from the other three.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawOrientation {
	pub x: f64,
	pub y: f64,
	pub z: f64,
	#[serde(default)]
	pub w: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleKind {
	Orientation(RawOrientation),
	Acceleration(Acceleration),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
	/// Monotonic host timestamp.
	pub timestamp_ns: u64,
	pub kind: SampleKind,
}

impl SensorSample {
	#[must_use]
	pub const fn orientation(timestamp_ns: u64, orientation: RawOrientation) -> Self {
		Self { timestamp_ns, kind: SampleKind::Orientation(orientation) }
	}

	#[must_use]
	pub const fn acceleration(timestamp_ns: u64, acceleration: Acceleration) -> Self {
		Self { timestamp_ns, kind: SampleKind::Acceleration(acceleration) }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
	pub latitude: f64,
	pub longitude: f64,
}

impl Position {
	#[must_use]
	pub const fn new(latitude: f64, longitude: f64) -> Self {
		Self { latitude, longitude }
	}
}

/// A closed detection window: the world-frame peak and when the window closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionEvent {
	pub peak: Acceleration,
	pub detected_at: DateTime<Utc>,
}

/// What actually lands in the event store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotholeRecord {
	pub latitude: f64,
	pub longitude: f64,
	/// Vertical world-frame acceleration of the peak sample.
	pub peak_vertical: f64,
	pub detected_at: DateTime<Utc>,
	pub reported_at: DateTime<Utc>,
}

impl PotholeRecord {
	#[must_use]
	pub const fn position(&self) -> Position {
		Position::new(self.latitude, self.longitude)
	}
}
