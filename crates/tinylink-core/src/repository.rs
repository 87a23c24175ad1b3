use crate::error::StorageError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A stored URL record in the repository.
///
/// Records are created once per distinct original URL and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// The short code assigned to the URL.
    pub code: ShortCode,
    /// The original URL that was shortened.
    pub original_url: String,
    /// The counter value the code was encoded from.
    pub counter: u64,
    /// When the record was created.
    pub created_at: Timestamp,
    /// When the record expires, if ever.
    pub expire_at: Option<Timestamp>,
}

impl UrlRecord {
    /// Returns whether the record has expired as of `now`. The record is
    /// still live at the `expire_at` instant itself.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expire_at.is_some_and(|expire_at| now > expire_at)
    }

    /// Returns how long the record stays valid after `now`.
    ///
    /// `None` means the record never expires. A negative duration means it
    /// has already expired.
    pub fn remaining_at(&self, now: Timestamp) -> Option<SignedDuration> {
        self.expire_at.map(|expire_at| expire_at.duration_since(now))
    }
}

/// A read-only view of a repository.
///
/// Lookups return records regardless of their expiration; callers decide
/// whether an expired record may be served.
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Retrieves the record for a given short code.
    /// Returns `None` if the code does not exist.
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<UrlRecord>>;

    /// Retrieves the record created for a given original URL.
    /// Returns `None` if the URL has never been shortened.
    async fn find_by_url(&self, original_url: &str) -> Result<Option<UrlRecord>>;
}

#[async_trait]
pub trait Repository: ReadRepository {
    /// Inserts a new record.
    ///
    /// Returns `Err(CodeConflict)` if the code already exists and
    /// `Err(UrlConflict)` if the original URL already has a record.
    async fn insert(&self, record: &UrlRecord) -> Result<()>;
}
