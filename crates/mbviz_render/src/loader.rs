//! Background mesh loading
//!
//! [`MeshLoader`] owns a worker thread that parses OBJ files off the frame
//! thread. Results come back through a single-consumer channel and are only
//! drained by the synchronizer at the start of an update, so the render graph
//! never changes while it is being traversed.

use std::collections::HashSet;
use std::path::PathBuf;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use crate::{AssetError, MeshGeometry};

/// Request to load a mesh in the background
struct LoadRequest {
    hash: u64,
    path: PathBuf,
}

/// Result of a background mesh load
pub struct MeshLoadResult {
    /// Path hash the request was made for
    pub hash: u64,
    pub path: PathBuf,
    /// The parsed geometry or error
    pub result: Result<MeshGeometry, AssetError>,
}

/// Background mesh loader using a dedicated worker thread
///
/// Each path hash is requested at most once for the lifetime of the loader.
pub struct MeshLoader {
    sender: Sender<LoadRequest>,
    receiver: Receiver<MeshLoadResult>,
    requested: HashSet<u64>,
    in_flight: usize,
}

impl MeshLoader {
    /// Create a new loader with a background worker thread
    ///
    /// The worker thread runs until the MeshLoader is dropped.
    pub fn new() -> Self {
        let (request_tx, request_rx) = unbounded::<LoadRequest>();
        let (result_tx, result_rx) = unbounded::<MeshLoadResult>();

        let spawned = thread::Builder::new()
            .name("mbviz-mesh-loader".to_string())
            .spawn(move || {
                while let Ok(request) = request_rx.recv() {
                    let result = MeshGeometry::load_obj(&request.path);
                    let load_result = MeshLoadResult {
                        hash: request.hash,
                        path: request.path,
                        result,
                    };
                    if result_tx.send(load_result).is_err() {
                        break;
                    }
                }
            });
        if let Err(e) = spawned {
            log::error!("Failed to spawn mesh loader thread: {}", e);
        }

        Self {
            sender: request_tx,
            receiver: result_rx,
            requested: HashSet::new(),
            in_flight: 0,
        }
    }

    /// Queue a mesh file for loading
    ///
    /// Returns false if this hash was already requested.
    pub fn request(&mut self, hash: u64, path: impl Into<PathBuf>) -> bool {
        if !self.requested.insert(hash) {
            return false;
        }
        let path = path.into();
        log::debug!("Queued background mesh load: {}", path.display());
        if self.sender.send(LoadRequest { hash, path }).is_ok() {
            self.in_flight += 1;
        }
        true
    }

    /// Whether this hash has been requested before
    pub fn is_requested(&self, hash: u64) -> bool {
        self.requested.contains(&hash)
    }

    /// Number of requests whose results have not been collected yet
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Check for one completed load (non-blocking)
    pub fn poll(&mut self) -> Option<MeshLoadResult> {
        match self.receiver.try_recv() {
            Ok(result) => {
                self.in_flight -= 1;
                Some(result)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Collect all completed loads (non-blocking)
    pub fn poll_all(&mut self) -> Vec<MeshLoadResult> {
        let mut results = Vec::new();
        while let Some(result) = self.poll() {
            results.push(result);
        }
        results
    }
}

impl Default for MeshLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_for(loader: &mut MeshLoader, count: usize) -> Vec<MeshLoadResult> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut results = Vec::new();
        while results.len() < count && Instant::now() < deadline {
            results.extend(loader.poll_all());
            std::thread::sleep(Duration::from_millis(5));
        }
        results
    }

    #[test]
    fn test_poll_returns_none_when_empty() {
        let mut loader = MeshLoader::new();
        assert!(loader.poll().is_none());
        assert!(loader.poll_all().is_empty());
        assert_eq!(loader.in_flight(), 0);
    }

    #[test]
    fn test_load_nonexistent_file_returns_error() {
        let mut loader = MeshLoader::new();
        assert!(loader.request(42, "/nonexistent/mesh.obj"));
        assert_eq!(loader.in_flight(), 1);

        let results = wait_for(&mut loader, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].hash, 42);
        assert!(matches!(results[0].result, Err(AssetError::NotFound(_))));
        assert_eq!(loader.in_flight(), 0);
    }

    #[test]
    fn test_each_hash_requested_once() {
        let mut loader = MeshLoader::new();
        assert!(loader.request(1, "/nonexistent/a.obj"));
        assert!(!loader.request(1, "/nonexistent/a.obj"));
        assert!(loader.request(2, "/nonexistent/b.obj"));
        assert!(loader.is_requested(1));

        let results = wait_for(&mut loader, 2);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_load_real_file() {
        let path = std::env::temp_dir().join("mbviz_loader_test.obj");
        std::fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

        let mut loader = MeshLoader::new();
        loader.request(9, &path);
        let results = wait_for(&mut loader, 1);
        let mesh = results[0].result.as_ref().unwrap();
        assert_eq!(mesh.triangle_count(), 1);

        let _ = std::fs::remove_file(&path);
    }
}
