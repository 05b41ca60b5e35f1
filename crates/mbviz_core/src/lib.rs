//! Core types for the mbviz multibody visualizer
//!
//! This crate provides the physical side of a scene:
//!
//! - [`World`] - Arenas of bodies, particle clouds, links, shapes and materials
//! - [`Body`], [`ParticleCloud`], [`Link`] - The physical entities
//! - [`EntityRef`] - Non-owning reference to any entity
//! - [`VisualModel`] - Shape instances attached to an entity
//! - [`ShapeGeometry`] - The closed set of visual shape descriptors
//! - [`VisualMaterial`] - Surface appearance
//! - [`Scene`] - Loadable/saveable scene description

mod entity;
mod material;
mod scene;
mod shapes;
mod visual;
mod world;

pub use entity::{
    Body, BodyKey, CloudKey, EntityRef, Link, LinkKey, LinkKind, MaterialKey, Particle,
    ParticleCloud, ShapeKey, SineMotion,
};
pub use material::VisualMaterial;
pub use scene::{
    BodyTemplate, CloudTemplate, FrameTemplate, LinkTemplate, Scene, SceneError, SceneLoadError,
    SceneSaveError, ShapeInstanceTemplate, ShapeTemplate,
};
pub use shapes::{ShapeGeometry, ShapeKind, VisualShape};
pub use visual::{ShapeInstance, ShapeInstanceId, VisualModel};
pub use world::{World, WorldConfig};

// Re-export commonly used math types for convenience
pub use mbviz_math::{DQuat, DVec3, Frame};
