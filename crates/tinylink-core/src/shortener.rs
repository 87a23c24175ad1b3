use crate::error::ShortenerError;
use crate::repository::UrlRecord;
use async_trait::async_trait;
use jiff::Timestamp;
use std::time::Duration;

type Result<T> = std::result::Result<T, ShortenerError>;

/// Expiration policy for a shortened URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationPolicy {
    /// The shortened URL never expires.
    Never,
    /// The shortened URL expires after a certain duration from creation.
    AfterDuration(Duration),
    /// The shortened URL expires at a specific timestamp.
    AtTimestamp(Timestamp),
}

impl ExpirationPolicy {
    /// Expiry measured in whole days; zero days means the link never expires.
    pub fn after_days(days: u32) -> Self {
        match days {
            0 => Self::Never,
            days => Self::AfterDuration(Duration::from_secs(u64::from(days) * 24 * 60 * 60)),
        }
    }
}

/// Parameters for creating a shortened URL.
#[derive(Debug, Clone)]
pub struct ShortenParams {
    /// The original URL to be shortened.
    pub original_url: String,
    /// The expiration policy for the shortened URL.
    pub expiration: ExpirationPolicy,
}

impl ShortenParams {
    pub fn new(original_url: impl Into<String>) -> Self {
        Self {
            original_url: original_url.into(),
            expiration: ExpirationPolicy::Never,
        }
    }

    pub fn with_expiration(mut self, expiration: ExpirationPolicy) -> Self {
        self.expiration = expiration;
        self
    }
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Returns the record for `params.original_url`, creating one with a
    /// freshly allocated code if the URL has never been shortened.
    async fn shorten(&self, params: ShortenParams) -> Result<UrlRecord>;

    /// Resolves a short code to its original URL.
    /// Returns `None` if the code is malformed, unknown, or expired.
    async fn resolve(&self, code: &str) -> Result<Option<String>>;
}
