use crate::types::{Acceleration, RotationMatrix};

/// Rotates a device-frame acceleration into the world frame.
///
/// The rotation is inverted by transposition, valid because it is orthonormal.
#[must_use]
pub fn transform(rotation: &RotationMatrix, accel_device_frame: &Acceleration) -> Acceleration {
	rotation.transpose() * accel_device_frame
}
