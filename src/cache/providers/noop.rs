//! No-op cache provider.
//!
//! Always misses on read and succeeds silently on write. This is the
//! fallback when caching is disabled or the configured backend cannot be
//! reached at startup: the system keeps serving, just without a cache.

use std::time::Duration;

use crate::cache::errors::CacheResult;
use crate::cache::traits::CacheService;

/// Cache service that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCache;

impl NoOpCache {
    pub fn new() -> Self {
        Self
    }
}

impl CacheService for NoOpCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn delete_pattern(&self, _pattern: &str) -> CacheResult<u64> {
        Ok(0)
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "noop"
    }
}
