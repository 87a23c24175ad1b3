use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use tinylink_core::cache::Result;
use tinylink_core::{CacheError, ShortCode, UrlCache};
use tracing::{debug, trace, warn};

pub const DEFAULT_KEY_PREFIX: &str = "url";

/// A Redis-based implementation of [`UrlCache`].
///
/// Entries live under `<prefix>:<code>` and hold the original URL as a plain
/// string, so other tools can read them without knowing the record layout.
#[derive(Debug, Clone)]
pub struct RedisUrlCache {
    conn: redis::aio::MultiplexedConnection,
    key_prefix: String,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if message.to_ascii_lowercase().contains("timed out") {
        CacheError::Timeout(message)
    } else {
        CacheError::Operation(message)
    }
}

impl RedisUrlCache {
    /// Creates a new Redis URL cache using the default `url` key prefix.
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self::with_prefix(conn, DEFAULT_KEY_PREFIX)
    }

    /// Creates a new Redis URL cache with a custom key prefix (e.g., "myapp:url").
    pub fn with_prefix(
        conn: redis::aio::MultiplexedConnection,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    /// Opens a connection to `addr` and checks it with a PING.
    pub async fn connect(addr: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(addr)
            .map_err(|e| map_redis_error("invalid cache address", e))?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::Unavailable(format!("failed to connect to Redis cache: {e}")))?;
        conn.ping::<()>()
            .await
            .map_err(|e| CacheError::Unavailable(format!("Redis cache PING failed: {e}")))?;

        Ok(Self::with_prefix(conn, key_prefix))
    }

    fn cache_key(&self, code: &ShortCode) -> String {
        format!("{}:{}", self.key_prefix, code.as_str())
    }
}

#[async_trait]
impl UrlCache for RedisUrlCache {
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>> {
        let key = self.cache_key(code);
        trace!(code = %code, "Fetching URL from Redis cache");

        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(url)) => {
                debug!(code = %code, "Cache hit in Redis");
                Ok(Some(url))
            }
            Ok(None) => {
                trace!(code = %code, "Cache miss in Redis");
                Ok(None)
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Redis error on get");
                Err(map_redis_error("failed to fetch value from Redis", e))
            }
        }
    }

    async fn set_url(&self, code: &ShortCode, url: &str, ttl: Option<Duration>) -> Result<()> {
        let key = self.cache_key(code);
        trace!(code = %code, "Storing URL in Redis cache");

        let mut conn = self.conn.clone();
        let result = match ttl {
            // PSETEX rejects a zero expiry
            Some(ttl) => {
                let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
                conn.pset_ex::<_, _, ()>(&key, url, millis).await
            }
            None => conn.set::<_, _, ()>(&key, url).await,
        };

        match result {
            Ok(()) => {
                debug!(code = %code, ttl = ?ttl, "Cached URL in Redis");
                Ok(())
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Failed to cache URL in Redis");
                Err(map_redis_error("failed to write value to Redis", e))
            }
        }
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        let key = self.cache_key(code);
        trace!(code = %code, "Removing URL from Redis cache");

        let mut conn = self.conn.clone();
        match conn.del::<_, ()>(&key).await {
            Ok(()) => {
                debug!(code = %code, "Removed URL from Redis cache");
                Ok(())
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Failed to remove URL from Redis cache");
                Err(map_redis_error("failed to delete value from Redis", e))
            }
        }
    }
}
