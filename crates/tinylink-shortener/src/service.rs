use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tinylink_cache::LookupCache;
use tinylink_core::{
    ExpirationPolicy, Repository, ShortCode, ShortenParams, Shortener, ShortenerError,
    StorageError, UrlCache, UrlRecord,
};
use tinylink_generator::{GenerateError, Generator};
use tracing::{debug, trace, warn};

type Result<T> = std::result::Result<T, ShortenerError>;

/// Upper bound on a single durable store round trip.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// Issues short codes for URLs and resolves them back.
///
/// Shortening is idempotent per original URL: the durable store is checked
/// first, and a new code is only generated for URLs it has never seen.
/// Resolution reads through the [`LookupCache`] and never serves a record
/// past its expiry.
pub struct ResolutionService<R, G, C: ?Sized> {
    repository: Arc<R>,
    generator: Arc<G>,
    cache: LookupCache<C>,
    store_timeout: Duration,
}

impl<R, G, C> ResolutionService<R, G, C>
where
    R: Repository,
    G: Generator,
    C: UrlCache + ?Sized,
{
    pub fn new(repository: Arc<R>, generator: Arc<G>, cache: LookupCache<C>) -> Self {
        Self {
            repository,
            generator,
            cache,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Bounds every durable store call; an elapsed call fails with
    /// `StorageError::Timeout`.
    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = std::result::Result<T, StorageError>>,
    ) -> std::result::Result<T, StorageError> {
        tokio::time::timeout(self.store_timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(StorageError::Timeout(format!(
                    "{operation} exceeded {:?}",
                    self.store_timeout
                )))
            })
    }

    /// Expiry rounded down to whole seconds, the precision the store keeps.
    fn expire_at(expiration: ExpirationPolicy, now: Timestamp) -> Result<Option<Timestamp>> {
        let expire_at = match expiration {
            ExpirationPolicy::Never => return Ok(None),
            ExpirationPolicy::AfterDuration(duration) => {
                let duration = SignedDuration::try_from(duration)
                    .map_err(|e| ShortenerError::InvalidExpiration(e.to_string()))?;
                now.checked_add(duration)
                    .map_err(|e| ShortenerError::InvalidExpiration(e.to_string()))?
            }
            ExpirationPolicy::AtTimestamp(timestamp) => timestamp,
        };
        whole_seconds(expire_at)
            .map(Some)
            .map_err(|e| ShortenerError::InvalidExpiration(e.to_string()))
    }

    /// Handles losing an insert race for the same URL: the record that won
    /// is the canonical one, and the code generated here is dropped.
    async fn canonical_record(&self, lost: &UrlRecord) -> Result<UrlRecord> {
        debug!(
            code = %lost.code,
            counter = lost.counter,
            "url was shortened concurrently, discarding generated code"
        );
        self.bounded("find_by_url", self.repository.find_by_url(&lost.original_url))
            .await?
            .ok_or_else(|| {
                ShortenerError::Storage(StorageError::UrlConflict(lost.original_url.clone()))
            })
    }
}

fn whole_seconds(timestamp: Timestamp) -> std::result::Result<Timestamp, jiff::Error> {
    Timestamp::from_second(timestamp.as_second())
}

fn map_generate_error(err: GenerateError) -> ShortenerError {
    if err.is_unavailable() {
        ShortenerError::AllocationUnavailable(err.to_string())
    } else {
        ShortenerError::Allocation(err.to_string())
    }
}

#[async_trait]
impl<R, G, C> Shortener for ResolutionService<R, G, C>
where
    R: Repository,
    G: Generator,
    C: UrlCache + ?Sized,
{
    async fn shorten(&self, params: ShortenParams) -> Result<UrlRecord> {
        let existing = self
            .bounded("find_by_url", self.repository.find_by_url(&params.original_url))
            .await?;
        if let Some(existing) = existing {
            trace!(code = %existing.code, "url already shortened");
            return Ok(existing);
        }

        let now = whole_seconds(Timestamp::now())
            .map_err(|e| ShortenerError::InvalidExpiration(e.to_string()))?;
        let expire_at = Self::expire_at(params.expiration, now)?;
        let generated = self.generator.generate().await.map_err(map_generate_error)?;

        let record = UrlRecord {
            code: generated.code,
            original_url: params.original_url,
            counter: generated.counter,
            created_at: now,
            expire_at,
        };

        let record = match self.bounded("insert", self.repository.insert(&record)).await {
            Ok(()) => record,
            Err(StorageError::UrlConflict(_)) => self.canonical_record(&record).await?,
            Err(e) => {
                warn!(code = %record.code, error = %e, "failed to store record");
                return Err(e.into());
            }
        };

        self.cache.put_record(&record, Timestamp::now()).await;
        debug!(code = %record.code, "shortened url");
        Ok(record)
    }

    async fn resolve(&self, code: &str) -> Result<Option<String>> {
        let code = match ShortCode::parse(code) {
            Ok(code) => code,
            Err(e) => {
                debug!(error = %e, "rejecting malformed short code");
                return Ok(None);
            }
        };

        if let Some(url) = self.cache.get(&code).await {
            trace!(code = %code, "resolved from cache");
            return Ok(Some(url));
        }

        let record = self
            .bounded("find_by_code", self.repository.find_by_code(&code))
            .await?;
        let Some(record) = record else {
            trace!(code = %code, "short code not found");
            return Ok(None);
        };

        let now = Timestamp::now();
        if record.is_expired_at(now) {
            debug!(code = %code, "record has expired");
            return Ok(None);
        }

        self.cache.put_record(&record, now).await;
        Ok(Some(record.original_url))
    }
}
