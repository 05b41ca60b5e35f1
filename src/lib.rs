//! mbviz - Multibody visualizer
//!
//! Library half of the `mbviz` binary: configuration, scene construction and
//! the simulation/render systems that drive the frame loop.

pub mod config;
pub mod scene;
pub mod systems;
