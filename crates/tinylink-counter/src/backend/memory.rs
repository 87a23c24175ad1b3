use crate::backend::{CoordinationBackend, Node, Version};
use crate::error::{CounterError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-local coordination backend.
///
/// Only suitable for a single process or for tests; several counter stores in
/// the same process may share one instance through an `Arc`.
#[derive(Debug)]
pub struct InMemoryBackend {
    nodes: Mutex<HashMap<String, Node>>,
    reachable: AtomicBool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(HashMap::new()),
            reachable: AtomicBool::new(true),
        }
    }

    /// Simulates losing (or regaining) the connection to the service.
    ///
    /// While unreachable, every operation fails with `Unavailable`.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CounterError::Unavailable(
                "in-memory backend is unreachable".to_string(),
            ))
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoordinationBackend for InMemoryBackend {
    async fn get(&self, path: &str) -> Result<Option<Node>> {
        self.check_reachable()?;
        Ok(self.nodes.lock().get(path).cloned())
    }

    async fn create(&self, path: &str, data: &str) -> Result<bool> {
        self.check_reachable()?;
        let mut nodes = self.nodes.lock();
        if nodes.contains_key(path) {
            return Ok(false);
        }
        nodes.insert(
            path.to_string(),
            Node {
                data: data.to_string(),
                version: 0,
            },
        );
        Ok(true)
    }

    async fn set_if_version(&self, path: &str, data: &str, version: Version) -> Result<()> {
        self.check_reachable()?;
        let mut nodes = self.nodes.lock();
        let node = nodes
            .get_mut(path)
            .ok_or_else(|| CounterError::NoNode(path.to_string()))?;

        if node.version != version {
            return Err(CounterError::VersionConflict {
                path: path.to_string(),
            });
        }

        node.data = data.to_string();
        node.version += 1;
        Ok(())
    }
}
