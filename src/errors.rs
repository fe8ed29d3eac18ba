//! Structured error handling for the resource-access core.
//!
//! The taxonomy matters more than the payloads: callers route on the
//! variant. `Busy` maps to a 503-equivalent and is never retried
//! internally; `TransientBackend` is retried by the resource façade with
//! pool recreation; `FatalBackend` surfaces immediately with the pool left
//! intact; `CacheUnavailable` is a soft failure that always degrades to a
//! cache miss.
//!
//! Errors are `Clone` (string payloads only) so a single failure can be
//! fanned out to every waiter of a deduplicated in-flight computation.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HelixError {
    /// The concurrency gate queue timed out before a slot freed up.
    /// The operation never reached the backend.
    #[error("resource busy: {0}")]
    Busy(String),

    /// A backend fault matching the known transient patterns
    /// (socket reset, connection closed, timeout, login failure, DNS).
    #[error("transient backend fault [{code}]: {message}")]
    TransientBackend { code: String, message: String },

    /// Any other backend fault. Surfaced immediately, never retried.
    #[error("backend fault: {0}")]
    FatalBackend(String),

    /// The cache layer could not serve the request. Callers treat this
    /// identically to a miss; it must never fail a request.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Invalid configuration or connection descriptor.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl HelixError {
    /// Build a transient backend fault with a stable classification code.
    pub fn transient(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransientBackend {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Build a fatal backend fault.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::FatalBackend(message.into())
    }

    /// Whether the retry policy may re-attempt after this failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientBackend { .. })
    }

    /// The classification code for transient faults, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::TransientBackend { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Result type used throughout the crate.
pub type HelixResult<T> = std::result::Result<T, HelixError>;
