pub mod memory;
pub mod redis;

use crate::error::Result;
use async_trait::async_trait;

pub use self::memory::InMemoryBackend;
pub use self::redis::RedisBackend;

/// Version of a node's data; advanced by every successful write.
pub type Version = u64;

/// A coordination node's data together with its current version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub data: String,
    pub version: Version,
}

/// The contract a coordination service must satisfy to host the counter.
///
/// Every operation is linearizable with respect to a single node. Nodes are
/// created with version `0`.
#[async_trait]
pub trait CoordinationBackend: Send + Sync + 'static {
    /// Reads a node. Returns `Ok(None)` if it does not exist.
    async fn get(&self, path: &str) -> Result<Option<Node>>;

    /// Creates a node holding `data`.
    ///
    /// Returns `Ok(false)` if the node already exists, so concurrent creators
    /// all succeed.
    async fn create(&self, path: &str, data: &str) -> Result<bool>;

    /// Overwrites a node's data only if its version still equals `version`.
    ///
    /// Fails with `VersionConflict` if another writer got there first and with
    /// `NoNode` if the node is missing.
    async fn set_if_version(&self, path: &str, data: &str, version: Version) -> Result<()>;

    /// Releases the connection to the coordination service.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
