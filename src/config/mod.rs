//! # Resource Core Configuration
//!
//! Typed configuration for the resource-access and cache layers. Every
//! tunable has an explicit field with a stated default; environment
//! variables override individual values. Configuration is validated once
//! at construction instead of being re-parsed from opaque strings at each
//! call site.
//!
//! ## Usage
//!
//! ```rust
//! use helix_core::config::ResourceConfig;
//!
//! let config = ResourceConfig::from_environment();
//! assert!(config.validate().is_ok());
//! ```

pub mod cache_ttl;

use std::env;
use std::time::Duration;
use tracing::info;

use crate::errors::{HelixError, HelixResult};

pub use cache_ttl::{CacheTtlConfig, Dataset, DatasetTtl};

/// Top-level configuration for the resource-access layer.
#[derive(Debug, Clone)]
pub struct ResourceConfig {
    /// Process-wide cap on simultaneous resource operations, across all
    /// pools. The real constraint is total outbound connection pressure
    /// on the host, not any single backend.
    pub max_concurrent_ops: usize,

    /// Maximum time a caller may wait for a concurrency slot before the
    /// acquire fails with `Busy`.
    pub queue_timeout: Duration,

    /// Per-pool connection bounds and lifetimes.
    pub pool: PoolConfig,

    /// Timeout for establishing connectivity to a new backend.
    pub connect_timeout: Duration,

    /// Timeout for a single unit of work against a live connection.
    pub request_timeout: Duration,

    /// Transient-fault retry behavior.
    pub retry: RetryConfig,

    /// Background health monitoring cadence.
    pub health: HealthConfig,
}

/// Connection bounds for one pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

/// Retry and backoff parameters for transient backend faults.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first (so 3 = initial + 2 retries).
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `base * 2^n` plus jitter.
    pub backoff_base: Duration,
    /// Upper bound of the uniform random jitter added to each backoff.
    pub backoff_jitter: Duration,
}

/// Background health monitor parameters.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// How often idle pools are probed.
    pub interval: Duration,
    /// Per-pool probe timeout; a pool that cannot answer a no-op query
    /// inside this window is evicted.
    pub probe_timeout: Duration,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            max_concurrent_ops: 25,
            queue_timeout: Duration::from_secs(30),
            pool: PoolConfig::default(),
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(60),
            retry: RetryConfig::default(),
            health: HealthConfig::default(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 25,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(20),
            idle_timeout: Duration::from_secs(30),
            max_lifetime: Duration::from_secs(3600),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(200),
            backoff_jitter: Duration::from_millis(100),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(120),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

impl ResourceConfig {
    /// Load defaults and apply environment variable overrides.
    pub fn from_environment() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment variable overrides to configuration
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(n) = read_env_u64("HELIX_SQL_MAX_CONCURRENT") {
            self.max_concurrent_ops = n as usize;
            info!("Overriding max concurrent resource ops from env: {}", n);
        }
        if let Some(secs) = read_env_u64("HELIX_SQL_QUEUE_TIMEOUT_SECS") {
            self.queue_timeout = Duration::from_secs(secs);
            info!("Overriding gate queue timeout from env: {}s", secs);
        }
        if let Some(n) = read_env_u64("HELIX_SQL_POOL_MAX") {
            self.pool.max_connections = n as u32;
            info!("Overriding pool max connections from env: {}", n);
        }
        if let Some(n) = read_env_u64("HELIX_SQL_POOL_MIN") {
            self.pool.min_connections = n as u32;
            info!("Overriding pool min connections from env: {}", n);
        }
        if let Some(secs) = read_env_u64("HELIX_SQL_POOL_ACQUIRE_TIMEOUT_SECS") {
            self.pool.acquire_timeout = Duration::from_secs(secs);
            info!("Overriding pool acquire timeout from env: {}s", secs);
        }
        if let Some(secs) = read_env_u64("HELIX_SQL_POOL_IDLE_TIMEOUT_SECS") {
            self.pool.idle_timeout = Duration::from_secs(secs);
            info!("Overriding pool idle timeout from env: {}s", secs);
        }
        if let Some(secs) = read_env_u64("HELIX_SQL_CONNECT_TIMEOUT_SECS") {
            self.connect_timeout = Duration::from_secs(secs);
            info!("Overriding connect timeout from env: {}s", secs);
        }
        if let Some(secs) = read_env_u64("HELIX_SQL_REQUEST_TIMEOUT_SECS") {
            self.request_timeout = Duration::from_secs(secs);
            info!("Overriding request timeout from env: {}s", secs);
        }
        if let Some(n) = read_env_u64("HELIX_SQL_RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = n as u32;
            info!("Overriding retry max attempts from env: {}", n);
        }
        if let Some(secs) = read_env_u64("HELIX_SQL_HEALTH_INTERVAL_SECS") {
            self.health.interval = Duration::from_secs(secs);
            info!("Overriding health check interval from env: {}s", secs);
        }
        if let Some(secs) = read_env_u64("HELIX_SQL_HEALTH_PROBE_TIMEOUT_SECS") {
            self.health.probe_timeout = Duration::from_secs(secs);
            info!("Overriding health probe timeout from env: {}s", secs);
        }
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> HelixResult<()> {
        if self.max_concurrent_ops == 0 {
            return Err(HelixError::Configuration(
                "max concurrent resource ops must be greater than 0".to_string(),
            ));
        }
        if self.queue_timeout.is_zero() {
            return Err(HelixError::Configuration(
                "gate queue timeout must be greater than 0".to_string(),
            ));
        }
        if self.pool.max_connections == 0 {
            return Err(HelixError::Configuration(
                "pool max connections must be greater than 0".to_string(),
            ));
        }
        if self.pool.min_connections > self.pool.max_connections {
            return Err(HelixError::Configuration(format!(
                "pool min connections ({}) exceeds max connections ({})",
                self.pool.min_connections, self.pool.max_connections
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(HelixError::Configuration(
                "retry max attempts must be at least 1".to_string(),
            ));
        }
        if self.health.interval.is_zero() {
            return Err(HelixError::Configuration(
                "health check interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the distributed cache layer.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Master switch; disabled means every read is a miss and every write
    /// succeeds silently.
    pub enabled: bool,
    /// Backend selector: `redis`, `memory`, or anything else for no-op.
    pub backend: String,
    /// Connection URL for distributed backends. Credentials may be a
    /// static key or a short-lived bearer token supplied by the external
    /// credential provider; the cache only consumes the resulting URL.
    pub url: Option<String>,
    /// Fallback TTL when no dataset-specific TTL applies.
    pub default_ttl: Duration,
    /// Entry cap for the in-process backend.
    pub memory_max_capacity: u64,
    /// Per-dataset TTL strategy.
    pub ttl: CacheTtlConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: "redis".to_string(),
            url: None,
            default_ttl: Duration::from_secs(600),
            memory_max_capacity: 10_000,
            ttl: CacheTtlConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Load defaults and apply environment variable overrides.
    pub fn from_environment() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment variable overrides to configuration
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(enabled) = env::var("HELIX_CACHE_ENABLED") {
            self.enabled = enabled.parse().unwrap_or(self.enabled);
            info!("Overriding cache enabled from env: {}", self.enabled);
        }
        if let Ok(backend) = env::var("HELIX_CACHE_BACKEND") {
            info!("Overriding cache backend from env: {}", backend);
            self.backend = backend;
        }
        if let Ok(url) = env::var("HELIX_CACHE_URL") {
            if !url.trim().is_empty() {
                self.url = Some(url);
            }
        }
        if let Some(secs) = read_env_u64("HELIX_CACHE_DEFAULT_TTL_SECS") {
            self.default_ttl = Duration::from_secs(secs);
            info!("Overriding cache default TTL from env: {}s", secs);
        }
        if let Some(n) = read_env_u64("HELIX_CACHE_MEMORY_MAX_CAPACITY") {
            self.memory_max_capacity = n;
            info!("Overriding in-memory cache capacity from env: {}", n);
        }
        self.ttl = self.ttl.with_env_overrides();
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> HelixResult<()> {
        if self.default_ttl.is_zero() {
            return Err(HelixError::Configuration(
                "cache default TTL must be greater than 0".to_string(),
            ));
        }
        self.ttl.validate()
    }
}

fn read_env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|raw| raw.parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ResourceConfig::default();
        assert_eq!(config.max_concurrent_ops, 25);
        assert_eq!(config.queue_timeout, Duration::from_secs(30));
        assert_eq!(config.pool.max_connections, 25);
        assert_eq!(config.pool.min_connections, 2);
        assert_eq!(config.pool.idle_timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(15));
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.health.interval, Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_capacity_gate() {
        let config = ResourceConfig {
            max_concurrent_ops: 0,
            ..ResourceConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_pool_bounds() {
        let mut config = ResourceConfig::default();
        config.pool.min_connections = 50;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_override_applies() {
        env::set_var("HELIX_SQL_MAX_CONCURRENT", "7");
        let config = ResourceConfig::default().with_env_overrides();
        assert_eq!(config.max_concurrent_ops, 7);
        env::remove_var("HELIX_SQL_MAX_CONCURRENT");
    }

    #[test]
    fn unparseable_env_override_is_ignored() {
        env::set_var("HELIX_SQL_QUEUE_TIMEOUT_SECS", "not-a-number");
        let config = ResourceConfig::default().with_env_overrides();
        assert_eq!(config.queue_timeout, Duration::from_secs(30));
        env::remove_var("HELIX_SQL_QUEUE_TIMEOUT_SECS");
    }

    #[test]
    fn cache_defaults_validate() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.backend, "redis");
        assert!(config.validate().is_ok());
    }
}
