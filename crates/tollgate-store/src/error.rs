//! Error types for the storage layer.

use thiserror::Error;

/// A result type using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record was not found.
    #[error("record not found")]
    NotFound,

    /// The email address is already registered to another user.
    #[error("email already in use")]
    EmailTaken,

    /// The username is already taken by another user.
    #[error("username already in use")]
    UsernameTaken,

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A result type using `CacheError`.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Errors raised by a cache backend.
///
/// Every variant is transient: the operation could not be completed, which
/// says nothing about the key being looked up.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The operation did not complete before its deadline.
    #[error("cache operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The backend could not be reached or rejected the command.
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        Self::Backend(err.to_string())
    }
}
