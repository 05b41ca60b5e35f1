//! Mesh cache keyed by file path hash
//!
//! Every external mesh file is loaded at most once per cache. Render nodes
//! that reference the same file share one geometry but keep their own
//! transforms. The cache is append-only: entries live as long as the
//! synchronizer that owns it.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{AssetError, MeshGeometry};

/// Stable hash of a mesh file path
///
/// The path is hashed as written; `a.obj` and `./a.obj` are different keys.
pub fn path_hash(path: &Path) -> u64 {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    hasher.finish()
}

struct CacheEntry {
    mesh: Arc<MeshGeometry>,
    /// Path the geometry was loaded from (diagnostics only)
    path: PathBuf,
}

/// Path-hash keyed store of loaded mesh geometry
///
/// Geometry is shared through `Arc`, so graphs bound at different times can
/// all reference the single loaded copy.
#[derive(Default)]
pub struct MeshCache {
    entries: HashMap<u64, CacheEntry>,
    /// Number of file loads attempted through [`get_or_load`](Self::get_or_load)
    loads: usize,
}

impl MeshCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached geometry for `path`, loading the file on first use
    ///
    /// Failed loads are not cached; the error is returned to the caller.
    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<MeshGeometry>, AssetError> {
        let hash = path_hash(path);
        if let Some(entry) = self.entries.get(&hash) {
            log::trace!("Mesh cache hit: {}", path.display());
            return Ok(Arc::clone(&entry.mesh));
        }

        self.loads += 1;
        let mesh = MeshGeometry::load_obj(path)?;
        log::debug!(
            "Loaded mesh {} ({} vertices, {} triangles)",
            path.display(),
            mesh.vertex_count(),
            mesh.triangle_count()
        );
        Ok(self.insert_loaded(hash, path.to_path_buf(), mesh))
    }

    /// Insert geometry that was loaded elsewhere (e.g. by the background loader)
    ///
    /// If the hash is already cached the existing geometry is returned and
    /// `mesh` is dropped.
    pub fn insert_loaded(&mut self, hash: u64, path: PathBuf, mesh: MeshGeometry) -> Arc<MeshGeometry> {
        let entry = self.entries.entry(hash).or_insert_with(|| CacheEntry {
            mesh: Arc::new(mesh),
            path,
        });
        Arc::clone(&entry.mesh)
    }

    /// Cached geometry for a path hash
    pub fn get(&self, hash: u64) -> Option<Arc<MeshGeometry>> {
        self.entries.get(&hash).map(|e| Arc::clone(&e.mesh))
    }

    /// Whether the file at `path` is cached
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(&path_hash(path))
    }

    /// Path a cached hash was loaded from
    pub fn path(&self, hash: u64) -> Option<&Path> {
        self.entries.get(&hash).map(|e| e.path.as_path())
    }

    /// Number of cached meshes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of synchronous file loads attempted so far
    pub fn load_count(&self) -> usize {
        self.loads
    }
}
