use crate::backend::{CoordinationBackend, Node, Version};
use crate::error::{CounterError, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};
use tracing::{debug, info, trace, warn};

/// Creates the node hash unless the key already exists.
const CREATE_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return 0
end
redis.call('HSET', KEYS[1], 'data', ARGV[1], 'version', 0)
return 1
"#;

/// Writes the node only when its stored version equals ARGV[1].
/// Returns -1 for a missing node, 0 for a version mismatch, 1 on success.
const SET_IF_VERSION_SCRIPT: &str = r#"
local version = redis.call('HGET', KEYS[1], 'version')
if not version then
  return -1
end
if version ~= ARGV[1] then
  return 0
end
redis.call('HSET', KEYS[1], 'data', ARGV[2])
redis.call('HINCRBY', KEYS[1], 'version', 1)
return 1
"#;

/// A Redis-hosted coordination backend.
///
/// Each node is a hash `{data, version}` stored under `<key_prefix><path>`.
/// Creation and versioned writes run as Lua scripts, so each one is a single
/// atomic step on the Redis server no matter how many processes race on it.
#[derive(Debug, Clone)]
pub struct RedisBackend {
    conn: MultiplexedConnection,
    key_prefix: String,
    create_script: Script,
    set_if_version_script: Script,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CounterError {
    CounterError::Unavailable(format!("{operation}: {err}"))
}

impl RedisBackend {
    /// Creates a backend over an existing multiplexed connection.
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self::with_prefix(conn, "tinylink:coord:")
    }

    /// Creates a backend with a custom key prefix (e.g., "myapp:coord:").
    pub fn with_prefix(conn: MultiplexedConnection, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
            create_script: Script::new(CREATE_SCRIPT),
            set_if_version_script: Script::new(SET_IF_VERSION_SCRIPT),
        }
    }

    /// Opens a connection to `addr` and checks it with a PING.
    pub async fn connect(addr: &str) -> Result<Self> {
        let client = redis::Client::open(addr)
            .map_err(|e| map_redis_error("invalid coordination address", e))?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| map_redis_error("failed to connect to coordination service", e))?;
        conn.ping::<()>()
            .await
            .map_err(|e| map_redis_error("coordination service PING failed", e))?;

        info!(addr = %addr, "connected to coordination service");
        Ok(Self::new(conn))
    }

    fn node_key(&self, path: &str) -> String {
        format!("{}{}", self.key_prefix, path)
    }
}

#[async_trait]
impl CoordinationBackend for RedisBackend {
    async fn get(&self, path: &str) -> Result<Option<Node>> {
        let key = self.node_key(path);
        trace!(path = %path, "reading coordination node");

        let mut conn = self.conn.clone();
        let (data, version): (Option<String>, Option<Version>) = redis::cmd("HMGET")
            .arg(&key)
            .arg("data")
            .arg("version")
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to read coordination node", e))?;

        match (data, version) {
            (Some(data), Some(version)) => Ok(Some(Node { data, version })),
            (None, None) => Ok(None),
            _ => Err(CounterError::CorruptedData {
                path: path.to_string(),
                reason: "node hash is missing its data or version field".to_string(),
            }),
        }
    }

    async fn create(&self, path: &str, data: &str) -> Result<bool> {
        let key = self.node_key(path);
        let mut conn = self.conn.clone();

        let created: i64 = self
            .create_script
            .key(&key)
            .arg(data)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to create coordination node", e))?;

        debug!(path = %path, created = created == 1, "ensured coordination node");
        Ok(created == 1)
    }

    async fn set_if_version(&self, path: &str, data: &str, version: Version) -> Result<()> {
        let key = self.node_key(path);
        let mut conn = self.conn.clone();

        let outcome: i64 = self
            .set_if_version_script
            .key(&key)
            .arg(version)
            .arg(data)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to write coordination node", e))?;

        match outcome {
            1 => Ok(()),
            0 => Err(CounterError::VersionConflict {
                path: path.to_string(),
            }),
            _ => Err(CounterError::NoNode(path.to_string())),
        }
    }

    async fn close(&self) -> Result<()> {
        // Dropping the last clone of the multiplexed connection closes it;
        // QUIT only tells the server early.
        let mut conn = self.conn.clone();
        if let Err(e) = redis::cmd("QUIT").query_async::<()>(&mut conn).await {
            warn!(error = %e, "failed to close coordination connection cleanly");
        }
        info!("coordination service connection closed");
        Ok(())
    }
}
