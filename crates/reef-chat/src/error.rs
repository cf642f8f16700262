//! Error taxonomy of the chat layer.

use reef_store::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChatError>;

/// Every public operation fails with exactly one of these.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Malformed input, rejected before any backend call.
    #[error("validation error: {0}")]
    Validation(String),

    /// Optimistic save lost against a concurrent writer; the caller retries
    /// with a fresh fetch. Never retried silently.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Transport/auth/server failure, original diagnostic preserved.
    #[error("backend error: {0}")]
    Backend(String),

    /// A local entity invariant would be broken, rejected before any
    /// backend call.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A record or event payload did not decode into the expected entity.
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(detail) => ChatError::Conflict(detail),
            StoreError::NotFound(detail) => ChatError::NotFound(detail),
            other => ChatError::Backend(other.to_string()),
        }
    }
}
