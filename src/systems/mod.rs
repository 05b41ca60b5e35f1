//! Application systems
//!
//! The frame driver is split into a simulation system that advances the world
//! and a render system that keeps the render graph in sync with it.

mod render;
mod simulation;

pub use render::RenderSystem;
pub use simulation::{SimulationResult, SimulationSystem};
