use std::time::Duration;
use thiserror::Error;

/// Result type for policy store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for engine and admin operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Policy store errors.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Transient backend failure; the operation may be retried.
    #[error("policy store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored row could not be decoded.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The backend rejected the statement; retrying will not help.
    #[error("policy store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Errors raised by the compiler, the engine and the admin adapter.
#[derive(Debug, Clone, Error)]
pub enum PolicyError {
    /// The resolved length bounds cannot be satisfied.
    #[error("password policy is inconsistent: minimum length {min_len} exceeds maximum length {max_len}")]
    Inconsistent { min_len: usize, max_len: usize },

    /// No active parameter exists for any recognized key.
    #[error("password policy unavailable: no active parameters")]
    Unavailable,

    /// Unknown parameter key or type id.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request deadline expired before the operation completed.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Underlying store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}
