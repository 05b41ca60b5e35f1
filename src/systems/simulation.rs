//! Simulation system
//!
//! Advances the world by whole fixed time steps. Frame time that does not
//! fill a step is carried over to the next frame.

use mbviz_core::World;

use crate::config::SimulationConfig;

/// Result of a simulation update
pub struct SimulationResult {
    /// Number of fixed steps taken this frame
    pub steps: u32,
    /// Simulation time after the frame
    pub time: f64,
}

/// Steps the world at a fixed rate
pub struct SimulationSystem {
    time_step: f64,
    max_frame_dt: f64,
    accumulator: f64,
}

impl SimulationSystem {
    /// Create a simulation system from config
    ///
    /// A non-positive time step falls back to the default.
    pub fn new(config: &SimulationConfig) -> Self {
        let time_step = if config.time_step > 0.0 {
            config.time_step
        } else {
            log::warn!("Invalid time step {}, using default", config.time_step);
            SimulationConfig::default().time_step
        };
        Self {
            time_step,
            max_frame_dt: config.max_frame_dt.max(time_step),
            accumulator: 0.0,
        }
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Run one simulation frame
    ///
    /// # Arguments
    /// * `world` - World to advance
    /// * `frame_dt` - Wall time covered by this frame
    pub fn update(&mut self, world: &mut World, frame_dt: f64) -> SimulationResult {
        // Cap dt so a stalled frame does not trigger a burst of steps
        self.accumulator += frame_dt.clamp(0.0, self.max_frame_dt);

        let mut steps = 0;
        while self.accumulator >= self.time_step {
            world.step(self.time_step);
            self.accumulator -= self.time_step;
            steps += 1;
        }

        SimulationResult {
            steps,
            time: world.time(),
        }
    }
}

impl Default for SimulationSystem {
    fn default() -> Self {
        Self::new(&SimulationConfig::default())
    }
}
