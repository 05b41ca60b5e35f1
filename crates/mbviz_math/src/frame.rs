//! Rigid frame (position, rotation)
//!
//! A Frame places a child coordinate system inside a parent one. Frames are
//! how bodies carry their pose, how a visual model sits on its body, and how a
//! shape instance is attached inside a visual model.

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// A rigid frame: rotation followed by translation
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Origin of the frame in parent coordinates
    pub position: DVec3,
    /// Orientation of the frame relative to the parent
    pub rotation: DQuat,
}

impl Default for Frame {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Frame {
    /// The identity frame (no translation, no rotation)
    pub const IDENTITY: Self = Self {
        position: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
    };

    /// Create a frame from position and rotation
    pub fn new(position: DVec3, rotation: DQuat) -> Self {
        Self { position, rotation }
    }

    /// Create a frame with just a position
    pub fn from_position(position: DVec3) -> Self {
        Self {
            position,
            rotation: DQuat::IDENTITY,
        }
    }

    /// Create a frame from a position and an axis-angle rotation
    ///
    /// A zero-length axis yields no rotation.
    pub fn from_axis_angle(position: DVec3, axis: DVec3, angle: f64) -> Self {
        let axis = axis.normalize_or_zero();
        let rotation = if axis == DVec3::ZERO {
            DQuat::IDENTITY
        } else {
            DQuat::from_axis_angle(axis, angle)
        };
        Self { position, rotation }
    }

    /// Transform a point from this frame into the parent
    #[inline]
    pub fn transform_point(&self, p: DVec3) -> DVec3 {
        self.rotation * p + self.position
    }

    /// Rotate a direction from this frame into the parent
    #[inline]
    pub fn transform_vector(&self, v: DVec3) -> DVec3 {
        self.rotation * v
    }

    /// Compose two frames: result = self * other
    ///
    /// The composed frame applies `other` first, then `self`. With `self` the
    /// visual model frame in world and `other` a shape attachment inside the
    /// model, the result is the shape's world frame.
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            position: self.transform_point(other.position),
            rotation: (self.rotation * other.rotation).normalize(),
        }
    }

    /// Compute the inverse frame
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            position: rotation * -self.position,
            rotation,
        }
    }

    /// Decompose the rotation into (unit axis, angle in radians)
    ///
    /// The identity rotation is reported as axis +X with angle 0.
    pub fn axis_angle(&self) -> (DVec3, f64) {
        self.rotation.to_axis_angle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_identity_frame() {
        let f = Frame::IDENTITY;
        let p = DVec3::new(1.0, 2.0, 3.0);
        assert!(f.transform_point(p).abs_diff_eq(p, EPSILON));
    }

    #[test]
    fn test_rotation_then_translation() {
        let f = Frame::from_axis_angle(DVec3::new(10.0, 0.0, 0.0), DVec3::Z, FRAC_PI_2);
        let p = f.transform_point(DVec3::X);
        assert!(p.abs_diff_eq(DVec3::new(10.0, 1.0, 0.0), EPSILON), "got {:?}", p);
    }

    #[test]
    fn test_compose_order() {
        let body = Frame::from_position(DVec3::new(1.0, 0.0, 0.0));
        let attach = Frame::from_position(DVec3::new(0.0, 2.0, 0.0));

        let composed = body.compose(&attach);
        assert!(composed.position.abs_diff_eq(DVec3::new(1.0, 2.0, 0.0), EPSILON));
    }

    #[test]
    fn test_compose_rotated_parent() {
        let body = Frame::from_axis_angle(DVec3::ZERO, DVec3::Z, FRAC_PI_2);
        let attach = Frame::from_position(DVec3::X);

        // Attachment offset is rotated by the parent
        let composed = body.compose(&attach);
        assert!(composed.position.abs_diff_eq(DVec3::Y, EPSILON));
    }

    #[test]
    fn test_inverse_round_trip() {
        let f = Frame::from_axis_angle(DVec3::new(1.0, 2.0, 3.0), DVec3::new(1.0, 1.0, 0.0), 0.7);
        let p = DVec3::new(-4.0, 0.5, 2.0);
        let back = f.inverse().transform_point(f.transform_point(p));
        assert!(back.abs_diff_eq(p, 1e-9));
    }

    #[test]
    fn test_zero_axis_is_identity() {
        let f = Frame::from_axis_angle(DVec3::ZERO, DVec3::ZERO, 1.0);
        assert_eq!(f.rotation, DQuat::IDENTITY);
    }

    #[test]
    fn test_axis_angle_identity() {
        let (axis, angle) = Frame::IDENTITY.axis_angle();
        assert_eq!(angle, 0.0);
        assert_eq!(axis, DVec3::X);
    }
}
