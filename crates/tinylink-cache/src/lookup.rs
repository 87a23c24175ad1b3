use jiff::Timestamp;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tinylink_core::{CacheError, ShortCode, UrlCache, UrlRecord};
use tracing::{trace, warn};
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct LookupCacheSettings {
    /// Lifetime of a cached entry, unless the record expires sooner.
    #[builder(default = Duration::from_secs(24 * 60 * 60))]
    pub ttl: Duration,
    /// Upper bound on a single cache round trip.
    #[builder(default = Duration::from_millis(250))]
    pub op_timeout: Duration,
}

impl Default for LookupCacheSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Cache-aside front for the resolution path.
///
/// Never fails: cache errors and timeouts are logged and turn into a miss
/// on read and a no-op on write. The durable store stays authoritative.
pub struct LookupCache<C: ?Sized> {
    cache: Arc<C>,
    settings: LookupCacheSettings,
}

impl<C: UrlCache + ?Sized> LookupCache<C> {
    pub fn new(cache: Arc<C>, settings: LookupCacheSettings) -> Self {
        Self { cache, settings }
    }

    /// Looks up `code`, treating any failure as a miss.
    pub async fn get(&self, code: &ShortCode) -> Option<String> {
        match self.bounded("get", self.cache.get_url(code)).await {
            Ok(url) => url,
            Err(e) => {
                warn!(code = %code, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Stores `code -> url` for `ttl`, ignoring failures.
    pub async fn put(&self, code: &ShortCode, url: &str, ttl: Duration) {
        if let Err(e) = self.bounded("set", self.cache.set_url(code, url, Some(ttl))).await {
            warn!(code = %code, error = %e, "cache write failed, skipping");
        }
    }

    /// Caches a record for the configured TTL, cut short so the entry never
    /// outlives the record. Records with no lifetime left are not cached.
    pub async fn put_record(&self, record: &UrlRecord, now: Timestamp) {
        match entry_ttl(self.settings.ttl, record, now) {
            Some(ttl) => self.put(&record.code, &record.original_url, ttl).await,
            None => trace!(code = %record.code, "record has no lifetime left, not caching"),
        }
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.settings.op_timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(CacheError::Timeout(format!(
                    "cache {operation} exceeded {:?}",
                    self.settings.op_timeout
                )))
            })
    }
}

/// The TTL to cache `record` with at `now`, or `None` when it must not be cached.
pub fn entry_ttl(configured: Duration, record: &UrlRecord, now: Timestamp) -> Option<Duration> {
    match record.remaining_at(now) {
        None => Some(configured),
        Some(remaining) if remaining.is_positive() => Duration::try_from(remaining)
            .ok()
            .map(|remaining| remaining.min(configured)),
        Some(_) => None,
    }
}
