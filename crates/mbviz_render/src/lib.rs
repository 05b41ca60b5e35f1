//! Render side of the mbviz multibody visualizer
//!
//! This crate turns a [`World`](mbviz_core::World) into a persistent render
//! graph and keeps the graph's transforms in sync with the simulation.
//!
//! ## Key Components
//!
//! - [`sync::SceneSync`] - Bind once, update transforms every frame
//! - [`graph::SceneGraph`] - Grouped render nodes plus the node binding side table
//! - [`mesh_cache::MeshCache`] - External mesh files, loaded once per path
//! - [`loader::MeshLoader`] - Background OBJ loading
//! - [`mesh::MeshGeometry`] - CPU-side vertex and index buffers
//!
//! ## Usage
//!
//! ```ignore
//! let mut sync = SceneSync::new(SyncParams::default());
//! let mut graph = sync.bind(&world);
//! loop {
//!     world.step(dt);
//!     sync.update(&mut graph, &world);
//! }
//! ```

pub mod asset_error;
pub mod graph;
pub mod loader;
pub mod mesh;
pub mod mesh_cache;
pub mod sync;

pub use asset_error::AssetError;
pub use graph::{
    DecoGrid, GeometryKey, GroupMask, NodeBinding, NodeGeometry, NodeKey, Primitive, RenderNode,
    SceneGraph, SceneGroup, TopologyEntry, TopologySignature,
};
pub use loader::{MeshLoadResult, MeshLoader};
pub use mesh::{MeshGeometry, MeshVertex, Topology};
pub use mesh_cache::{path_hash, MeshCache};
pub use sync::{SceneSync, SyncParams, UpdateStats};
