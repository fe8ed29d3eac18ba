//! Cache error types.

use thiserror::Error;

use crate::errors::HelixError;

/// Errors that can occur during cache operations
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Failed to connect to the cache backend
    #[error("cache connection error: {0}")]
    Connection(String),

    /// Failed to serialize or deserialize a cache value
    #[error("cache serialization error: {0}")]
    Serialization(String),

    /// Cache operation timed out
    #[error("cache operation timed out: {0}")]
    Timeout(String),

    /// Generic backend error
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

impl From<CacheError> for HelixError {
    fn from(err: CacheError) -> Self {
        HelixError::CacheUnavailable(err.to_string())
    }
}
