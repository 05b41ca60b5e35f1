//! Render system
//!
//! Owns the scene synchronizer and the render graph:
//! - Binds the world once on creation and adds the ground grid
//! - Updates node transforms every frame
//! - Periodically logs update statistics

use mbviz_core::World;
use mbviz_render::{DecoGrid, SceneGraph, SceneSync, UpdateStats};

use crate::config::VisualConfig;

/// Keeps a render graph in sync with a world
pub struct RenderSystem {
    sync: SceneSync,
    graph: SceneGraph,
    deco_grid: Option<DecoGrid>,
    stats_interval: u64,
    /// Stats accumulated since the last report
    window: UpdateStats,
}

impl RenderSystem {
    /// Bind `world` and create the render system
    pub fn new(world: &World, visual: &VisualConfig, stats_interval: u64) -> Self {
        let mut sync = SceneSync::new(visual.to_sync_params());
        let deco_grid = visual.deco_grid.to_deco_grid();
        let graph = Self::bind(&mut sync, world, deco_grid.as_ref());

        Self {
            sync,
            graph,
            deco_grid,
            stats_interval,
            window: UpdateStats::default(),
        }
    }

    fn bind(sync: &mut SceneSync, world: &World, deco_grid: Option<&DecoGrid>) -> SceneGraph {
        let mut graph = sync.bind(world);
        if let Some(grid) = deco_grid {
            graph.add_deco_grid(grid);
        }
        graph
    }

    /// Rebuild the graph after a topology change (entities or particles added or removed)
    ///
    /// The mesh cache is kept, so already loaded meshes are not read again.
    pub fn rebind(&mut self, world: &World) {
        self.graph = Self::bind(&mut self.sync, world, self.deco_grid.as_ref());
        log::info!("Rebound render graph: {} nodes", self.graph.node_count());
    }

    /// Refresh node transforms for the current frame
    pub fn update(&mut self, world: &World) -> UpdateStats {
        let stats = self.sync.update(&mut self.graph, world);

        self.window.updated += stats.updated;
        self.window.skipped_stale += stats.skipped_stale;
        self.window.skipped_clouds += stats.skipped_clouds;
        self.window.merged_meshes += stats.merged_meshes;

        let frame = self.sync.frame_number();
        if self.stats_interval > 0 && frame % self.stats_interval == 0 {
            log::info!(
                "Frame {}: {} transforms updated, {} stale, {} clouds skipped, {} meshes merged (last {} frames)",
                frame,
                self.window.updated,
                self.window.skipped_stale,
                self.window.skipped_clouds,
                self.window.merged_meshes,
                self.stats_interval
            );
            self.window = UpdateStats::default();
        }
        stats
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Mutable graph access (visibility toggles, entity removal)
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn sync(&self) -> &SceneSync {
        &self.sync
    }
}
