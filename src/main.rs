//! mbviz - Multibody visualizer
//!
//! Headless frame driver: binds the scene into a render graph once, then
//! steps the simulation and refreshes the graph every frame.

use std::path::Path;

use mbviz::config::AppConfig;
use mbviz::scene::SceneBuilder;
use mbviz::systems::{RenderSystem, SimulationSystem};
use mbviz_core::{Scene, World, WorldConfig};
use mbviz_render::SceneGroup;

/// Main application state
struct App {
    /// Application configuration
    config: AppConfig,
    world: World,
    simulation: SimulationSystem,
    render: RenderSystem,
}

impl App {
    fn new(config: AppConfig) -> Self {
        let world = load_world(&config);
        let simulation = SimulationSystem::new(&config.simulation);
        let render = RenderSystem::new(&world, &config.visual, config.debug.stats_interval);

        let graph = render.graph();
        log::info!(
            "Render graph: {} nodes ({} bodies, {} centers of mass, {} links, {} particles, {} decorations)",
            graph.node_count(),
            graph.group_len(SceneGroup::Bodies),
            graph.group_len(SceneGroup::CentersOfMass),
            graph.group_len(SceneGroup::Links),
            graph.group_len(SceneGroup::Particles),
            graph.group_len(SceneGroup::Decorations)
        );

        Self {
            config,
            world,
            simulation,
            render,
        }
    }

    /// Run the configured number of frames
    fn run(&mut self) {
        let frame_dt = self.simulation.time_step();
        let frames = self.config.simulation.frames;
        log::info!("Running {} frames at dt = {}", frames, frame_dt);

        for _ in 0..frames {
            // Physics first, then the graph picks up the new poses
            self.simulation.update(&mut self.world, frame_dt);
            self.render.update(&self.world);
        }

        log::info!(
            "Finished at t = {:.3}s after {} frames, {} meshes cached",
            self.world.time(),
            self.render.sync().frame_number(),
            self.render.sync().cache().len()
        );
    }
}

/// Load the configured scene, falling back to the built-in demo
///
/// Scenes without their own gravity get the configured one.
fn load_world(config: &AppConfig) -> World {
    let path = Path::new(&config.scene.path);
    if !path.exists() {
        log::info!("Scene '{}' not found, building masonry demo", path.display());
        return SceneBuilder::masonry_demo(config.simulation.gravity());
    }

    let scene = match Scene::load(path) {
        Ok(scene) => scene,
        Err(e) => {
            log::error!("Failed to load scene '{}': {}. Using masonry demo.", path.display(), e);
            return SceneBuilder::masonry_demo(config.simulation.gravity());
        }
    };

    match scene.instantiate() {
        Ok(mut world) => {
            if scene.gravity.is_none() {
                world.config = WorldConfig::new(config.simulation.gravity());
            }
            log::info!("Loaded scene '{}' from {}", scene.name, path.display());
            world
        }
        Err(e) => {
            log::error!("Failed to instantiate scene '{}': {}. Using masonry demo.", scene.name, e);
            SceneBuilder::masonry_demo(config.simulation.gravity())
        }
    }
}

fn main() {
    let loaded = AppConfig::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();

    // RUST_LOG wins over the configured level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.debug.log_level)).init();
    if let Err(e) = &loaded {
        log::warn!("Failed to load config: {}. Using defaults.", e);
    }
    log::info!("Starting mbviz");

    let mut app = App::new(config);
    app.run();
}
