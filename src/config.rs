//! Application configuration
//!
//! Configuration is loaded from multiple sources with the following priority (lowest to highest):
//! 1. `config/default.toml` (version controlled)
//! 2. `config/user.toml` (gitignored, user overrides)
//! 3. Environment variables (`MBV_SECTION__KEY`)

use figment::{Figment, providers::{Format, Toml, Env}};
use mbviz_core::{DVec3, Frame};
use mbviz_render::{DecoGrid, SyncParams};
use serde::{Serialize, Deserialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Scene configuration
    #[serde(default)]
    pub scene: SceneConfig,
    /// Render graph configuration
    #[serde(default)]
    pub visual: VisualConfig,
    /// Simulation configuration
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Debug configuration
    #[serde(default)]
    pub debug: DebugConfig,
}

impl AppConfig {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. `config/default.toml`
    /// 2. `config/user.toml`
    /// 3. Environment variables (`MBV_*`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific config directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let default_path = config_dir.join("default.toml");
        let user_path = config_dir.join("user.toml");

        let mut figment = Figment::new();

        if default_path.exists() {
            figment = figment.merge(Toml::file(&default_path));
        }

        if user_path.exists() {
            figment = figment.merge(Toml::file(&user_path));
        }

        // Environment variables override everything
        // MBV_VISUAL__WIREFRAME=true -> visual.wireframe = true
        figment = figment.merge(Env::prefixed("MBV_").split("__"));

        figment.extract().map_err(ConfigError::from)
    }
}

/// Scene configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// RON scene file; the built-in demo is used when it does not exist
    pub path: String,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            path: "scenes/masonry.ron".to_string(),
        }
    }
}

/// Render graph configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualConfig {
    /// Size of the center-of-mass symbols (0 = hidden)
    pub cog_symbol_size: f64,
    /// Draw shapes as wireframe
    pub wireframe: bool,
    /// Load OBJ meshes on a background thread
    pub async_mesh_loading: bool,
    /// Ground grid decoration
    #[serde(default)]
    pub deco_grid: DecoGridConfig,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            cog_symbol_size: 0.0,
            wireframe: false,
            async_mesh_loading: false,
            deco_grid: DecoGridConfig::default(),
        }
    }
}

impl VisualConfig {
    /// Synchronizer settings
    pub fn to_sync_params(&self) -> SyncParams {
        SyncParams {
            cog_symbol_size: self.cog_symbol_size,
            wireframe: self.wireframe,
            async_mesh_loading: self.async_mesh_loading,
        }
    }
}

/// Ground grid configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoGridConfig {
    pub enabled: bool,
    /// Cell size
    pub step: f64,
    /// Number of cells per side
    pub cells: u32,
    /// Height of the grid plane
    pub y: f64,
    /// Line color [r, g, b]
    pub color: [f32; 3],
}

impl Default for DecoGridConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            step: 0.5,
            cells: 20,
            y: -1.0,
            color: [0.35, 0.35, 0.4],
        }
    }
}

impl DecoGridConfig {
    /// Grid lying in the horizontal plane at height `y`, or None when disabled
    pub fn to_deco_grid(&self) -> Option<DecoGrid> {
        if !self.enabled {
            return None;
        }
        // Grid lines are generated in local XY; tilt them onto XZ
        let frame = Frame::from_axis_angle(
            DVec3::new(0.0, self.y, 0.0),
            DVec3::X,
            std::f64::consts::FRAC_PI_2,
        );
        Some(DecoGrid {
            u_step: self.step,
            v_step: self.step,
            nu: self.cells,
            nv: self.cells,
            frame,
            color: self.color,
        })
    }
}

/// Simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Fixed time step in seconds
    pub time_step: f64,
    /// Number of frames to run
    pub frames: u64,
    /// Gravity used when the scene does not set one [x, y, z]
    pub gravity: [f64; 3],
    /// Upper bound on the time advanced in a single frame
    pub max_frame_dt: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            time_step: 0.01,
            frames: 600,
            gravity: [0.0, -9.81, 0.0],
            max_frame_dt: 0.25,
        }
    }
}

impl SimulationConfig {
    pub fn gravity(&self) -> DVec3 {
        DVec3::from_array(self.gravity)
    }
}

/// Debug configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
    /// Log update statistics every N frames (0 = never)
    pub stats_interval: u64,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            stats_interval: 60,
        }
    }
}

/// Configuration error
#[derive(Debug)]
pub struct ConfigError {
    message: String,
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError {
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.scene.path, "scenes/masonry.ron");
        assert_eq!(config.simulation.gravity(), DVec3::new(0.0, -9.81, 0.0));
        assert_eq!(config.visual.cog_symbol_size, 0.0);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("cog_symbol_size"));
        assert!(toml.contains("time_step"));
        assert!(toml.contains("[visual.deco_grid]"));
    }

    #[test]
    fn test_sync_params_from_visual() {
        let visual = VisualConfig {
            cog_symbol_size: 0.1,
            wireframe: true,
            ..Default::default()
        };
        let params = visual.to_sync_params();
        assert_eq!(params.cog_symbol_size, 0.1);
        assert!(params.wireframe);
        assert!(!params.async_mesh_loading);
    }

    #[test]
    fn test_deco_grid_lies_flat() {
        let grid = DecoGridConfig::default().to_deco_grid().unwrap();
        // Local grid Y maps onto world Z
        let v = grid.frame.transform_vector(DVec3::Y);
        assert!(v.abs_diff_eq(DVec3::Z, 1e-12), "got {:?}", v);
        assert_eq!(grid.frame.position.y, -1.0);

        let disabled = DecoGridConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(disabled.to_deco_grid().is_none());
    }

    #[test]
    fn test_missing_dir_uses_defaults() {
        let config = AppConfig::load_from("/nonexistent/config").unwrap();
        assert_eq!(config.debug.stats_interval, 60);
    }
}
