//! Always-failing cache provider for fault injection.
//!
//! Every operation returns a backend error, simulating an unreachable
//! store. Used to exercise the fail-open paths: callers above the store
//! must behave exactly as they would on a miss.

use std::time::Duration;

use crate::cache::errors::{CacheError, CacheResult};
use crate::cache::traits::CacheService;

/// Cache service whose backend is permanently unreachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingCache;

impl FailingCache {
    pub fn new() -> Self {
        Self
    }

    fn unreachable_error(op: &str) -> CacheError {
        CacheError::Backend(format!("{op} failed: store unreachable"))
    }
}

impl CacheService for FailingCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(Self::unreachable_error("GET"))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Err(Self::unreachable_error("SET"))
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Err(Self::unreachable_error("DEL"))
    }

    async fn delete_pattern(&self, _pattern: &str) -> CacheResult<u64> {
        Err(Self::unreachable_error("SCAN"))
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Err(Self::unreachable_error("PING"))
    }

    fn provider_name(&self) -> &'static str {
        "failing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_operation_errors() {
        let cache = FailingCache::new();
        assert!(cache.get("key").await.is_err());
        assert!(cache.set("key", "value", Duration::from_secs(1)).await.is_err());
        assert!(cache.delete("key").await.is_err());
        assert!(cache.delete_pattern("hc:*").await.is_err());
        assert!(cache.health_check().await.is_err());
    }
}
