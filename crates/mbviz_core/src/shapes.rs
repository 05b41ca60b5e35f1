//! Visual shape descriptors
//!
//! [`ShapeGeometry`] is the closed set of geometric descriptors a visual model
//! can hold. Each variant stores its parameters in **shape-local space**; the
//! shape instance frame and the owning entity's visual frame place it in the
//! world.
//!
//! Shapes live in the world's shape arena and may be referenced by several
//! shape instances, possibly on different entities.

use std::path::PathBuf;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::MaterialKey;

/// Geometric descriptor of a visual shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShapeGeometry {
    /// Axis-aligned box centered at the origin
    Box {
        /// Half-length along each local axis
        half_lengths: DVec3,
    },
    /// Sphere centered at the origin
    Sphere {
        radius: f64,
    },
    /// Ellipsoid centered at the origin
    Ellipsoid {
        /// Semi-axis length along each local axis
        semi_axes: DVec3,
    },
    /// Capsule whose axis runs from `p1` to `p2`
    Capsule {
        radius: f64,
        p1: DVec3,
        p2: DVec3,
    },
    /// Cylinder whose axis runs from `p1` to `p2`
    Cylinder {
        radius: f64,
        p1: DVec3,
        p2: DVec3,
    },
    /// Cone with its axis along local +Y
    Cone {
        /// Base radii (x, z) and height (y)
        radii: DVec3,
    },
    /// Barrel (revolved arc); recognised but not renderable
    Barrel {
        y_low: f64,
        y_high: f64,
        axis_vert: f64,
        axis_hor: f64,
        r_offset: f64,
    },
    /// Inline triangle mesh
    TriangleMesh {
        vertices: Vec<DVec3>,
        indices: Vec<[u32; 3]>,
        #[serde(default = "unit_scale")]
        scale: DVec3,
    },
    /// Parametric surface sampled as a `nu` x `nv` grid of points (row-major in u)
    Surface {
        nu: u32,
        nv: u32,
        points: Vec<DVec3>,
    },
    /// External mesh file (Wavefront OBJ)
    ObjFile {
        path: PathBuf,
        #[serde(default = "unit_scale")]
        scale: DVec3,
    },
    /// Open polyline
    Line {
        points: Vec<DVec3>,
    },
    /// Polyline path, optionally closed
    Path {
        points: Vec<DVec3>,
        #[serde(default)]
        closed: bool,
    },
    /// Straight segment between the two anchors of a link
    Segment,
    /// Helical spring between the two anchors of a link
    Spring {
        radius: f64,
        #[serde(default = "default_turns")]
        turns: u32,
    },
}

fn unit_scale() -> DVec3 {
    DVec3::ONE
}

fn default_turns() -> u32 {
    5
}

/// Tag identifying a [`ShapeGeometry`] variant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Box,
    Sphere,
    Ellipsoid,
    Capsule,
    Cylinder,
    Cone,
    Barrel,
    TriangleMesh,
    Surface,
    ObjFile,
    Line,
    Path,
    Segment,
    Spring,
}

impl ShapeKind {
    /// Human-readable name for diagnostics
    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Box => "box",
            ShapeKind::Sphere => "sphere",
            ShapeKind::Ellipsoid => "ellipsoid",
            ShapeKind::Capsule => "capsule",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::Cone => "cone",
            ShapeKind::Barrel => "barrel",
            ShapeKind::TriangleMesh => "triangle mesh",
            ShapeKind::Surface => "surface",
            ShapeKind::ObjFile => "obj file",
            ShapeKind::Line => "line",
            ShapeKind::Path => "path",
            ShapeKind::Segment => "segment",
            ShapeKind::Spring => "spring",
        }
    }

    /// Whether the shape spans the two anchors of a link
    pub fn is_two_point(self) -> bool {
        matches!(self, ShapeKind::Segment | ShapeKind::Spring)
    }
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl ShapeGeometry {
    /// Variant tag of this geometry
    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeGeometry::Box { .. } => ShapeKind::Box,
            ShapeGeometry::Sphere { .. } => ShapeKind::Sphere,
            ShapeGeometry::Ellipsoid { .. } => ShapeKind::Ellipsoid,
            ShapeGeometry::Capsule { .. } => ShapeKind::Capsule,
            ShapeGeometry::Cylinder { .. } => ShapeKind::Cylinder,
            ShapeGeometry::Cone { .. } => ShapeKind::Cone,
            ShapeGeometry::Barrel { .. } => ShapeKind::Barrel,
            ShapeGeometry::TriangleMesh { .. } => ShapeKind::TriangleMesh,
            ShapeGeometry::Surface { .. } => ShapeKind::Surface,
            ShapeGeometry::ObjFile { .. } => ShapeKind::ObjFile,
            ShapeGeometry::Line { .. } => ShapeKind::Line,
            ShapeGeometry::Path { .. } => ShapeKind::Path,
            ShapeGeometry::Segment => ShapeKind::Segment,
            ShapeGeometry::Spring { .. } => ShapeKind::Spring,
        }
    }

    /// Create a box from its full side lengths
    pub fn box_from_size(size: DVec3) -> Self {
        ShapeGeometry::Box { half_lengths: size * 0.5 }
    }

    /// Create a sphere
    pub fn sphere(radius: f64) -> Self {
        ShapeGeometry::Sphere { radius }
    }

    /// Create a cylinder along local +Y, centered at the origin
    pub fn cylinder(radius: f64, height: f64) -> Self {
        let half = DVec3::new(0.0, height * 0.5, 0.0);
        ShapeGeometry::Cylinder { radius, p1: -half, p2: half }
    }

    /// Create a capsule along local +Y, centered at the origin
    ///
    /// `half_length` is the half-length of the cylindrical part.
    pub fn capsule(radius: f64, half_length: f64) -> Self {
        let half = DVec3::new(0.0, half_length, 0.0);
        ShapeGeometry::Capsule { radius, p1: -half, p2: half }
    }

    /// Create an OBJ file shape with unit scale
    pub fn obj_file(path: impl Into<PathBuf>) -> Self {
        ShapeGeometry::ObjFile { path: path.into(), scale: DVec3::ONE }
    }

    /// Create a spring with the default number of turns
    pub fn spring(radius: f64) -> Self {
        ShapeGeometry::Spring { radius, turns: default_turns() }
    }
}

/// A visual shape: geometry plus appearance
#[derive(Debug, Clone, PartialEq)]
pub struct VisualShape {
    /// Geometric descriptor
    pub geometry: ShapeGeometry,
    /// Materials; the first one is used for rendering
    pub materials: Vec<MaterialKey>,
    /// Invisible shapes are not bound into the render graph
    pub visible: bool,
}

impl VisualShape {
    /// Create a visible shape without materials
    pub fn new(geometry: ShapeGeometry) -> Self {
        Self {
            geometry,
            materials: Vec::new(),
            visible: true,
        }
    }

    /// Add a material
    pub fn with_material(mut self, material: MaterialKey) -> Self {
        self.materials.push(material);
        self
    }

    /// Set visibility
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Variant tag of the geometry
    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }

    /// The material used for rendering, if any
    pub fn primary_material(&self) -> Option<MaterialKey> {
        self.materials.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_from_size() {
        let g = ShapeGeometry::box_from_size(DVec3::new(2.0, 4.0, 6.0));
        assert_eq!(g, ShapeGeometry::Box { half_lengths: DVec3::new(1.0, 2.0, 3.0) });
    }

    #[test]
    fn test_cylinder_endpoints() {
        match ShapeGeometry::cylinder(0.5, 3.0) {
            ShapeGeometry::Cylinder { radius, p1, p2 } => {
                assert_eq!(radius, 0.5);
                assert_eq!((p2 - p1).length(), 3.0);
                assert_eq!(p1 + p2, DVec3::ZERO);
            }
            other => panic!("Expected Cylinder, got {:?}", other),
        }
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(ShapeGeometry::sphere(1.0).kind(), ShapeKind::Sphere);
        assert_eq!(ShapeGeometry::Segment.kind(), ShapeKind::Segment);
        assert!(ShapeKind::Spring.is_two_point());
        assert!(!ShapeKind::Cylinder.is_two_point());
        assert_eq!(ShapeKind::ObjFile.to_string(), "obj file");
    }

    #[test]
    fn test_visual_shape_defaults() {
        let shape = VisualShape::new(ShapeGeometry::sphere(1.0));
        assert!(shape.visible);
        assert!(shape.primary_material().is_none());
        assert!(!shape.with_visible(false).visible);
    }

    #[test]
    fn test_geometry_ron_round_trip() {
        let g = ShapeGeometry::ObjFile {
            path: PathBuf::from("meshes/wheel.obj"),
            scale: DVec3::new(1.0, 2.0, 1.0),
        };
        let text = ron::to_string(&g).unwrap();
        let back: ShapeGeometry = ron::from_str(&text).unwrap();
        assert_eq!(back, g);
    }

    #[test]
    fn test_geometry_from_ron_defaults() {
        let g: ShapeGeometry = ron::from_str(r#"(type: "ObjFile", path: "a.obj")"#).unwrap();
        assert_eq!(g, ShapeGeometry::obj_file("a.obj"));
    }
}
