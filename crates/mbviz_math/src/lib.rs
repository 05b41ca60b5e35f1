//! Math for the mbviz scene synchronizer
//!
//! Thin layer on top of `glam` (double precision) providing the pieces the
//! render synchronizer needs:
//!
//! ## Core Types
//!
//! - [`Frame`] - Position + rotation, composable like a rigid-body frame
//! - [`NodeTransform`] - Translation, rotation and non-uniform scale of a render node
//! - [`TwoPointGeometry`] - Anchor-to-anchor geometry for links, cylinders and capsules
//!
//! ## Helpers
//!
//! - [`orthonormal_basis`] - Right-handed basis whose Y axis follows a direction

mod frame;
mod node_transform;
pub mod two_point;

pub use frame::Frame;
pub use node_transform::NodeTransform;
pub use two_point::{orthonormal_basis, TwoPointGeometry};

// Re-export glam types used across the workspace
pub use glam::{DMat3, DMat4, DQuat, DVec3, DVec4};
