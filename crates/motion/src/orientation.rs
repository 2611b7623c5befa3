use nalgebra::{Quaternion, UnitQuaternion};

use crate::types::{RawOrientation, RotationMatrix};

/// Holds the latest device-to-world rotation. No history is kept.
#[derive(Debug, Default)]
pub struct OrientationTracker {
	current: Option<RotationMatrix>,
}

impl OrientationTracker {
	#[must_use]
	pub const fn new() -> Self {
		Self { current: None }
	}

	pub fn update_orientation(&mut self, sample: RawOrientation) -> RotationMatrix {
		let rotation = rotation_from_vector(sample);
		self.current = Some(rotation);
		rotation
	}

	/// `None` until the first orientation sample arrives.
	#[must_use]
	pub const fn current(&self) -> Option<RotationMatrix> {
		self.current
	}
}

/// Rotation-vector to rotation-matrix conversion, same as the host platform performs.
///
/// The quaternion is used as delivered; it is not re-normalized.
#[must_use]
pub fn rotation_from_vector(sample: RawOrientation) -> RotationMatrix {
	let RawOrientation { x, y, z, w } = sample;
	let w = w.unwrap_or_else(|| (1.0 - x * x - y * y - z * z).max(0.0).sqrt());

	UnitQuaternion::new_unchecked(Quaternion::new(w, x, y, z)).to_rotation_matrix().into_inner()
}

#[cfg(test)]
mod tests {
	use super::*;
	use nalgebra::Vector3;
	use std::f64::consts::FRAC_PI_2;

	fn assert_close(a: &RotationMatrix, b: &RotationMatrix) {
		assert!((a - b).abs().max() < 1e-9, "{a} != {b}");
	}

	#[test]
	fn identity_when_vector_part_is_zero() {
		let rotation = rotation_from_vector(RawOrientation { x: 0.0, y: 0.0, z: 0.0, w: None });
		assert_close(&rotation, &RotationMatrix::identity());
	}

	#[test]
	fn recovers_missing_scalar_part() {
		// 90° about z: vector part (0, 0, sin 45°), scalar cos 45°.
		let half = FRAC_PI_2 / 2.0;
		let implicit = rotation_from_vector(RawOrientation { x: 0.0, y: 0.0, z: half.sin(), w: None });
		let explicit = rotation_from_vector(RawOrientation { x: 0.0, y: 0.0, z: half.sin(), w: Some(half.cos()) });

		assert_close(&implicit, &explicit);

		let rotated = implicit * Vector3::new(1.0, 0.0, 0.0);
		assert!((rotated - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-9);
	}

	#[test]
	fn tracker_starts_empty_and_keeps_latest() {
		let mut tracker = OrientationTracker::new();
		assert!(tracker.current().is_none());

		tracker.update_orientation(RawOrientation { x: 0.5, y: 0.0, z: 0.0, w: None });
		let latest = tracker.update_orientation(RawOrientation { x: 0.0, y: 0.0, z: 0.0, w: Some(1.0) });

		assert_eq!(tracker.current(), Some(latest));
		assert_close(&latest, &RotationMatrix::identity());
	}

	#[test]
	fn produced_matrix_is_orthonormal() {
		let rotation = rotation_from_vector(RawOrientation { x: 0.1, y: -0.3, z: 0.2, w: None });
		assert_close(&(rotation.transpose() * rotation), &RotationMatrix::identity());
	}
}
