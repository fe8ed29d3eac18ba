//! Cache provider selection and dispatch.
//!
//! Enum dispatch over the configured backend, with graceful degradation:
//! a misconfigured or unreachable backend falls back to [`NoOpCache`]
//! with a warning instead of failing startup. The system never refuses to
//! boot because the cache is down.

use std::time::Duration;

use tracing::{info, warn};

use crate::cache::errors::CacheResult;
use crate::cache::providers::{FailingCache, NoOpCache};
use crate::cache::traits::CacheService;
use crate::config::CacheConfig;

#[cfg(feature = "cache-moka")]
use crate::cache::providers::MemoryCache;

#[cfg(feature = "cache-redis")]
use crate::cache::providers::RedisCache;

/// The selected cache backend.
#[derive(Debug, Clone)]
pub enum CacheProvider {
    /// Redis / compatible distributed cache.
    #[cfg(feature = "cache-redis")]
    Redis(Box<RedisCache>),

    /// In-process Moka cache.
    #[cfg(feature = "cache-moka")]
    Memory(Box<MemoryCache>),

    /// Fault-injection backend; every operation errors.
    Failing(FailingCache),

    /// Always-miss, always-succeed fallback.
    NoOp(NoOpCache),
}

impl CacheProvider {
    /// Select and connect a backend from configuration, degrading to
    /// NoOp on any failure.
    pub async fn from_config_graceful(config: &CacheConfig) -> Self {
        if !config.enabled {
            info!("Cache disabled by configuration");
            return Self::NoOp(NoOpCache::new());
        }

        match config.backend.as_str() {
            "redis" | "rediss" => Self::create_redis(config).await,
            "memory" | "moka" | "in-memory" => Self::create_memory(config),
            other => {
                warn!(backend = other, "Unknown cache backend, falling back to NoOp");
                Self::NoOp(NoOpCache::new())
            }
        }
    }

    #[cfg(feature = "cache-redis")]
    async fn create_redis(config: &CacheConfig) -> Self {
        match RedisCache::from_config(config).await {
            Ok(cache) => {
                info!(backend = "redis", "Cache provider initialized");
                Self::Redis(Box::new(cache))
            }
            Err(err) => {
                warn!(
                    error = %err,
                    "Failed to connect to Redis, falling back to NoOp cache"
                );
                Self::NoOp(NoOpCache::new())
            }
        }
    }

    #[cfg(not(feature = "cache-redis"))]
    async fn create_redis(_config: &CacheConfig) -> Self {
        warn!("Redis backend requested but 'cache-redis' feature not enabled, using NoOp");
        Self::NoOp(NoOpCache::new())
    }

    #[cfg(feature = "cache-moka")]
    fn create_memory(config: &CacheConfig) -> Self {
        let cache = MemoryCache::new(config.memory_max_capacity, config.default_ttl);
        info!(
            backend = "memory",
            max_capacity = config.memory_max_capacity,
            "Cache provider initialized"
        );
        Self::Memory(Box::new(cache))
    }

    #[cfg(not(feature = "cache-moka"))]
    fn create_memory(_config: &CacheConfig) -> Self {
        warn!("Memory backend requested but 'cache-moka' feature not enabled, using NoOp");
        Self::NoOp(NoOpCache::new())
    }

    /// A provider that caches nothing (for explicit opt-out or tests).
    pub fn noop() -> Self {
        Self::NoOp(NoOpCache::new())
    }

    /// A provider whose backend is permanently unreachable (for fault
    /// injection in tests and resilience drills).
    pub fn failing() -> Self {
        Self::Failing(FailingCache::new())
    }

    /// Whether this provider actually stores anything.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::NoOp(_))
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(cache) => cache.provider_name(),
            #[cfg(feature = "cache-moka")]
            Self::Memory(cache) => cache.provider_name(),
            Self::Failing(cache) => cache.provider_name(),
            Self::NoOp(cache) => cache.provider_name(),
        }
    }

    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(cache) => cache.get(key).await,
            #[cfg(feature = "cache-moka")]
            Self::Memory(cache) => cache.get(key).await,
            Self::Failing(cache) => cache.get(key).await,
            Self::NoOp(cache) => cache.get(key).await,
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(cache) => cache.set(key, value, ttl).await,
            #[cfg(feature = "cache-moka")]
            Self::Memory(cache) => cache.set(key, value, ttl).await,
            Self::Failing(cache) => cache.set(key, value, ttl).await,
            Self::NoOp(cache) => cache.set(key, value, ttl).await,
        }
    }

    pub async fn delete(&self, key: &str) -> CacheResult<()> {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(cache) => cache.delete(key).await,
            #[cfg(feature = "cache-moka")]
            Self::Memory(cache) => cache.delete(key).await,
            Self::Failing(cache) => cache.delete(key).await,
            Self::NoOp(cache) => cache.delete(key).await,
        }
    }

    pub async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(cache) => cache.delete_pattern(pattern).await,
            #[cfg(feature = "cache-moka")]
            Self::Memory(cache) => cache.delete_pattern(pattern).await,
            Self::Failing(cache) => cache.delete_pattern(pattern).await,
            Self::NoOp(cache) => cache.delete_pattern(pattern).await,
        }
    }

    pub async fn health_check(&self) -> CacheResult<bool> {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(cache) => cache.health_check().await,
            #[cfg(feature = "cache-moka")]
            Self::Memory(cache) => cache.health_check().await,
            Self::Failing(cache) => cache.health_check().await,
            Self::NoOp(cache) => cache.health_check().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_config_yields_noop() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let provider = CacheProvider::from_config_graceful(&config).await;
        assert!(!provider.is_enabled());
        assert_eq!(provider.provider_name(), "noop");
    }

    #[tokio::test]
    async fn unknown_backend_yields_noop() {
        let config = CacheConfig {
            backend: "memcached".to_string(),
            ..CacheConfig::default()
        };
        let provider = CacheProvider::from_config_graceful(&config).await;
        assert!(!provider.is_enabled());
    }

    #[cfg(feature = "cache-redis")]
    #[tokio::test]
    async fn redis_without_url_degrades_to_noop() {
        let config = CacheConfig {
            backend: "redis".to_string(),
            url: None,
            ..CacheConfig::default()
        };
        let provider = CacheProvider::from_config_graceful(&config).await;
        assert!(!provider.is_enabled());
    }

    #[cfg(feature = "cache-moka")]
    #[tokio::test]
    async fn memory_backend_is_enabled() {
        let config = CacheConfig {
            backend: "memory".to_string(),
            ..CacheConfig::default()
        };
        let provider = CacheProvider::from_config_graceful(&config).await;
        assert!(provider.is_enabled());
        assert_eq!(provider.provider_name(), "memory");
    }

    #[tokio::test]
    async fn failing_provider_reports_enabled_but_errors() {
        let provider = CacheProvider::failing();
        assert!(provider.is_enabled());
        assert!(provider.get("key").await.is_err());
    }
}
