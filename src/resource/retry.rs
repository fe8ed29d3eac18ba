//! Transient-fault classification and backoff.
//!
//! A failure is worth retrying when it matches the patterns seen from the
//! backends over the WAN: socket resets, half-closed connections,
//! timeouts, transient login rejections during failover, and DNS blips.
//! Classification checks the structured error first and falls back to
//! message text, since driver layers routinely wrap and rename errors.
//!
//! The policy itself only answers two questions per failure: retry or
//! not, and how long to wait. Pool eviction between attempts is the
//! manager's job.

use rand::Rng;
use std::io::ErrorKind;
use std::time::Duration;
use tracing::warn;

use crate::config::RetryConfig;
use crate::errors::HelixError;
use crate::resource::descriptor::redact_identity;

/// Message fragments that mark a wrapped error as transient even when the
/// structured code has been lost, with the stable code each maps to.
const TRANSIENT_MESSAGE_PATTERNS: &[(&str, &str)] = &[
    ("connection reset", "conn_reset"),
    ("connection closed", "conn_closed"),
    ("connection aborted", "conn_aborted"),
    ("connection refused", "conn_refused"),
    ("broken pipe", "broken_pipe"),
    ("timed out", "timeout"),
    ("timeout", "timeout"),
    ("login failed", "login"),
    ("password authentication failed", "login"),
    ("failed to lookup address", "dns"),
    ("name or service not known", "dns"),
    ("pool timed out", "pool_timeout"),
    ("pool closed", "pool_closed"),
];

/// Classify an error message against the known transient patterns.
pub fn classify_message(message: &str) -> Option<&'static str> {
    let lowered = message.to_lowercase();
    TRANSIENT_MESSAGE_PATTERNS
        .iter()
        .find(|(pattern, _)| lowered.contains(pattern))
        .map(|(_, code)| *code)
}

fn classify_io_kind(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::ConnectionReset => "conn_reset",
        ErrorKind::ConnectionAborted => "conn_aborted",
        ErrorKind::ConnectionRefused => "conn_refused",
        ErrorKind::BrokenPipe => "broken_pipe",
        ErrorKind::TimedOut => "timeout",
        ErrorKind::UnexpectedEof => "conn_closed",
        _ => "socket",
    }
}

impl From<sqlx::Error> for HelixError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            // Socket-level failures are always worth a reconnect.
            sqlx::Error::Io(io) => {
                HelixError::transient(classify_io_kind(io.kind()), err.to_string())
            }
            sqlx::Error::PoolTimedOut => HelixError::transient("pool_timeout", err.to_string()),
            sqlx::Error::PoolClosed => HelixError::transient("pool_closed", err.to_string()),
            sqlx::Error::Tls(_) => HelixError::transient("tls", err.to_string()),
            sqlx::Error::Database(db) => {
                // Login rejections and statement timeouts during backend
                // failover present as database errors; anything else from
                // the engine is a real fault in the request.
                match classify_message(db.message()) {
                    Some(code) => HelixError::transient(code, err.to_string()),
                    None => HelixError::fatal(err.to_string()),
                }
            }
            _ => match classify_message(&err.to_string()) {
                Some(code) => HelixError::transient(code, err.to_string()),
                None => HelixError::fatal(err.to_string()),
            },
        }
    }
}

/// Decides, per failure, whether to retry and how long to wait.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Whether a failure on zero-based `attempt` warrants another try.
    /// Only transient faults qualify; `Busy` and fatal faults never do.
    pub fn should_retry(&self, err: &HelixError, attempt: u32) -> bool {
        err.is_transient() && attempt + 1 < self.config.max_attempts
    }

    /// Delay before the retry that follows zero-based `attempt`:
    /// `base * 2^attempt` plus uniform jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base_ms = self.config.backoff_base.as_millis() as u64;
        let exponential_ms = base_ms.saturating_mul(1u64 << attempt.min(16));
        let jitter_cap_ms = self.config.backoff_jitter.as_millis() as u64;
        let jitter_ms = if jitter_cap_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_cap_ms)
        };
        Duration::from_millis(exponential_ms + jitter_ms)
    }

    /// Log a retry decision with its classification and attempt number.
    pub fn log_retry(&self, identity: &str, err: &HelixError, attempt: u32, delay: Duration) {
        warn!(
            backend = %redact_identity(identity),
            code = err.code().unwrap_or("unknown"),
            attempt = attempt + 1,
            max_attempts = self.config.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Transient backend fault; recreating pool and retrying"
        );
    }
}
