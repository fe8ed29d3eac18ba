//! In-process cache provider using Moka.
//!
//! Used for single-instance deployments and tests. Not distributed: each
//! process holds its own state, so invalidations do not propagate across
//! instances.

use std::time::Duration;

use crate::cache::errors::CacheResult;
use crate::cache::traits::CacheService;

/// In-memory cache service with TTL support.
#[derive(Clone)]
pub struct MemoryCache {
    cache: moka::future::Cache<String, String>,
    default_ttl: Duration,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("max_capacity", &self.cache.policy().max_capacity())
            .field("entry_count", &self.cache.entry_count())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl MemoryCache {
    /// Create a cache holding up to `max_capacity` entries, each expiring
    /// after `default_ttl`. Moka applies the TTL cache-wide, so per-entry
    /// TTLs passed to `set` are advisory here.
    pub fn new(max_capacity: u64, default_ttl: Duration) -> Self {
        let cache = moka::future::Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(default_ttl)
            .build();
        Self { cache, default_ttl }
    }
}

impl CacheService for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.cache.get(key).await)
    }

    async fn set(&self, key: &str, value: &str, _ttl: Duration) -> CacheResult<()> {
        self.cache.insert(key.to_string(), value.to_string()).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        // Only prefix patterns ("ns:kind:*") are supported in-process;
        // anything else falls back to TTL expiry.
        let Some(prefix) = pattern.strip_suffix('*') else {
            return Ok(0);
        };
        let prefix = prefix.to_string();
        let mut removed = 0u64;
        let matching: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| key.as_ref().clone())
            .collect();
        for key in matching {
            self.cache.invalidate(&key).await;
            removed += 1;
        }
        Ok(removed)
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
