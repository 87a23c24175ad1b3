use thiserror::Error;

/// Errors related to the core functionality of the URL shortener service.
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid short code format: {0}")]
    InvalidCodeFormat(String),
}

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out: {0}")]
    Timeout(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("short code already exists: {0}")]
    CodeConflict(String),
    #[error("url already shortened: {0}")]
    UrlConflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
}

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    /// The counter could not be advanced because the coordination service
    /// is unreachable. Retrying later may succeed.
    #[error("code allocation unavailable: {0}")]
    AllocationUnavailable(String),
    #[error("code allocation failed: {0}")]
    Allocation(String),
    #[error("invalid expiration: {0}")]
    InvalidExpiration(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
