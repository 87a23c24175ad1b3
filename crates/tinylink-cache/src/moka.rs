use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};
use tinylink_core::cache::Result;
use tinylink_core::{ShortCode, UrlCache};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
struct CachedUrl {
    url: String,
    ttl: Option<Duration>,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, CachedUrl> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedUrl,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedUrl,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// An in-process implementation of [`UrlCache`] backed by Moka.
///
/// Used when no shared cache is configured, and as the cache in tests.
#[derive(Debug, Clone)]
pub struct MokaUrlCache {
    cache: Cache<String, CachedUrl>,
}

impl MokaUrlCache {
    /// Creates a cache holding at most 10,000 entries.
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }
}

impl Default for MokaUrlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlCache for MokaUrlCache {
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>> {
        trace!(code = %code, "Fetching URL from Moka cache");

        match self.cache.get(code.as_str()).await {
            Some(entry) => {
                debug!(code = %code, "Cache hit in Moka");
                Ok(Some(entry.url))
            }
            None => {
                trace!(code = %code, "Cache miss in Moka");
                Ok(None)
            }
        }
    }

    async fn set_url(&self, code: &ShortCode, url: &str, ttl: Option<Duration>) -> Result<()> {
        let entry = CachedUrl {
            url: url.to_string(),
            ttl,
        };
        self.cache.insert(code.as_str().to_string(), entry).await;
        debug!(code = %code, ttl = ?ttl, "Cached URL in Moka");
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        self.cache.invalidate(code.as_str()).await;
        trace!(code = %code, "Removed URL from Moka cache (if present)");
        Ok(())
    }
}
