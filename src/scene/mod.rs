//! Scene construction utilities
//!
//! This module provides a declarative API for building multibody worlds.

mod scene_builder;

pub use scene_builder::{SceneBuilder, BRICK_SIZE};
