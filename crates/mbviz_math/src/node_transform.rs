//! Render node transform
//!
//! Every render node carries a 4x4 matrix built as translate * rotate * scale.
//! The scale is non-uniform and shape specific: it stretches a unit base
//! asset (unit cube, unit cylinder, ...) to the shape's dimensions.

use glam::{DMat4, DQuat, DVec3};

use crate::Frame;

/// Decomposed transform of a render node
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeTransform {
    /// World translation
    pub translation: DVec3,
    /// World rotation
    pub rotation: DQuat,
    /// Non-uniform scale applied to the base asset
    pub scale: DVec3,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl NodeTransform {
    /// Identity transform with unit scale
    pub const IDENTITY: Self = Self {
        translation: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
        scale: DVec3::ONE,
    };

    /// Create a transform from a world frame and a scale
    pub fn from_frame(frame: &Frame, scale: DVec3) -> Self {
        Self {
            translation: frame.position,
            rotation: frame.rotation,
            scale,
        }
    }

    /// Rotation as (unit axis, angle in radians)
    pub fn axis_angle(&self) -> (DVec3, f64) {
        self.rotation.to_axis_angle()
    }

    /// Build the node matrix: translate * rotate(axis, angle) * scale
    pub fn to_matrix(&self) -> DMat4 {
        let (axis, angle) = self.axis_angle();
        DMat4::from_translation(self.translation)
            * DMat4::from_axis_angle(axis, angle)
            * DMat4::from_scale(self.scale)
    }
}
