//! Two-point geometry
//!
//! Links, springs, cylinders and capsules are all described by two end points
//! rather than a body-relative orientation. The render assets for these shapes
//! are authored along local +Y, so the rotation computed here always maps +Y
//! onto the P1 -> P2 direction.
//!
//! Bind and Update both go through [`TwoPointGeometry::from_points`]; keeping a
//! single routine is what makes both phases agree on the orientation.

use glam::{DMat3, DQuat, DVec3};

/// Below this length a direction is treated as degenerate
const DEGENERATE_LENGTH: f64 = 1e-12;

/// Below this cross-product length the direction is considered parallel to the
/// reference axis
const SINGULAR_TOLERANCE: f64 = 1e-6;

/// Build a right-handed orthonormal basis `(x, y, z)` with `y = normalize(dir)`
///
/// World +Y is used as the reference vector, or +X when `dir` is (nearly)
/// parallel to +Y. Only `y` is load-bearing; `x` and `z` are any valid
/// perpendicular pair. A zero-length `dir` returns the identity basis.
pub fn orthonormal_basis(dir: DVec3) -> (DVec3, DVec3, DVec3) {
    let length = dir.length();
    if length < DEGENERATE_LENGTH {
        return (DVec3::X, DVec3::Y, DVec3::Z);
    }
    let primary = dir / length;

    let mut reference = DVec3::Y;
    if primary.cross(reference).length() < SINGULAR_TOLERANCE {
        reference = DVec3::X;
    }

    let side = primary.cross(reference).normalize();
    let up = side.cross(primary);

    // (primary, up, side) is right-handed; rotate it so primary lands on Y
    (side, primary, up)
}

/// Geometry of a shape spanning two points
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TwoPointGeometry {
    /// Unit direction from P1 to P2 (+Y when the points coincide)
    pub direction: DVec3,
    /// Distance between the points
    pub height: f64,
    /// Midpoint (P1 + P2) / 2
    pub midpoint: DVec3,
    /// Rotation taking local +Y onto `direction`
    pub rotation: DQuat,
}

impl TwoPointGeometry {
    /// Compute direction, height, midpoint and orientation from two points
    pub fn from_points(p1: DVec3, p2: DVec3) -> Self {
        let delta = p2 - p1;
        let height = delta.length();
        let (x, y, z) = orthonormal_basis(delta);
        let rotation = DQuat::from_mat3(&DMat3::from_cols(x, y, z)).normalize();

        Self {
            direction: y,
            height,
            midpoint: (p1 + p2) * 0.5,
            rotation,
        }
    }

    /// Rotation as (unit axis, angle in radians)
    pub fn axis_angle(&self) -> (DVec3, f64) {
        self.rotation.to_axis_angle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn assert_right_handed(x: DVec3, y: DVec3, z: DVec3) {
        assert!((x.length() - 1.0).abs() < EPSILON);
        assert!((y.length() - 1.0).abs() < EPSILON);
        assert!((z.length() - 1.0).abs() < EPSILON);
        assert!(x.dot(y).abs() < EPSILON);
        assert!(y.dot(z).abs() < EPSILON);
        assert!(x.cross(y).abs_diff_eq(z, EPSILON));
    }

    #[test]
    fn test_basis_primary_axis_is_y() {
        let dir = DVec3::new(1.0, 2.0, -0.5);
        let (x, y, z) = orthonormal_basis(dir);
        assert!(y.abs_diff_eq(dir.normalize(), EPSILON));
        assert_right_handed(x, y, z);
    }

    #[test]
    fn test_basis_parallel_to_reference() {
        let (x, y, z) = orthonormal_basis(DVec3::new(0.0, -3.0, 0.0));
        assert!(y.abs_diff_eq(-DVec3::Y, EPSILON));
        assert_right_handed(x, y, z);
    }

    #[test]
    fn test_basis_degenerate() {
        let (x, y, z) = orthonormal_basis(DVec3::ZERO);
        assert_eq!((x, y, z), (DVec3::X, DVec3::Y, DVec3::Z));
    }

    #[test]
    fn test_two_point_along_z() {
        let g = TwoPointGeometry::from_points(DVec3::ZERO, DVec3::new(0.0, 0.0, 4.0));
        assert!((g.height - 4.0).abs() < EPSILON);
        assert!(g.midpoint.abs_diff_eq(DVec3::new(0.0, 0.0, 2.0), EPSILON));
        assert!(g.direction.abs_diff_eq(DVec3::Z, EPSILON));
        // Asset axis (+Y) is mapped onto the link direction
        assert!((g.rotation * DVec3::Y).abs_diff_eq(DVec3::Z, EPSILON));
    }

    #[test]
    fn test_two_point_is_deterministic() {
        let p1 = DVec3::new(0.3, -1.0, 2.0);
        let p2 = DVec3::new(-2.0, 4.0, 1.0);
        let a = TwoPointGeometry::from_points(p1, p2);
        let b = TwoPointGeometry::from_points(p1, p2);
        assert_eq!(a, b);
    }

    #[test]
    fn test_two_point_coincident() {
        let p = DVec3::new(1.0, 1.0, 1.0);
        let g = TwoPointGeometry::from_points(p, p);
        assert_eq!(g.height, 0.0);
        assert_eq!(g.midpoint, p);
        assert!((g.rotation * DVec3::Y).abs_diff_eq(DVec3::Y, EPSILON));
    }
}
