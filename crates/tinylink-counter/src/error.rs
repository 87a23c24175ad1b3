use thiserror::Error;

/// Result type for counter operations.
pub type Result<T> = std::result::Result<T, CounterError>;

/// Errors returned by the coordination backends, the counter store and the
/// range allocator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CounterError {
    #[error("coordination service unavailable: {0}")]
    Unavailable(String),
    #[error("version conflict on '{path}'")]
    VersionConflict { path: String },
    #[error("coordination node does not exist: {0}")]
    NoNode(String),
    #[error("corrupted counter at '{path}': {reason}")]
    CorruptedData { path: String, reason: String },
    #[error("counter at '{0}' cannot advance without overflowing")]
    Exhausted(String),
    #[error("gave up reserving a counter range after {attempts} attempts")]
    MaxRetriesExceeded { attempts: u32 },
    #[error("invalid counter path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("range size must be positive")]
    InvalidRangeSize,
}

impl CounterError {
    /// Returns whether the failed operation may succeed if the caller tries
    /// again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::VersionConflict { .. } | Self::MaxRetriesExceeded { .. }
        )
    }
}
