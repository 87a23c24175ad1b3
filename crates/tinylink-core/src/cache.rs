use crate::error::CacheError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, CacheError>;

/// A cache from short code to original URL.
///
/// The cache is advisory: it is never the system of record, so losing an
/// entry only costs an extra repository read. Implementations can use Redis,
/// in-memory caches, or other storage backends.
#[async_trait]
pub trait UrlCache: Send + Sync + 'static {
    /// Get the original URL from cache.
    ///
    /// Returns `Ok(None)` if the key is not in the cache.
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>>;

    /// Store the original URL in cache with optional TTL.
    ///
    /// If `ttl` is `None`, the entry may persist indefinitely or use
    /// a default expiration policy depending on the implementation.
    async fn set_url(&self, code: &ShortCode, url: &str, ttl: Option<Duration>) -> Result<()>;

    /// Remove the entry from cache.
    ///
    /// It is not an error if the key does not exist.
    async fn del(&self, code: &ShortCode) -> Result<()>;
}
