//! Cache service trait definition.

use super::errors::CacheResult;
use std::time::Duration;

/// Trait defining cache operations.
///
/// Implemented by concrete cache providers (Redis, Memory, NoOp). All
/// operations are async and return [`CacheResult`] for error handling;
/// soft-failure policy lives above this trait, in the store.
pub trait CacheService: Send + Sync {
    /// Get a value from the cache by key.
    ///
    /// Returns `Ok(Some(value))` on cache hit, `Ok(None)` on cache miss.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = CacheResult<Option<String>>> + Send;

    /// Set a value in the cache with a TTL.
    fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = CacheResult<()>> + Send;

    /// Delete a specific key from the cache.
    fn delete(&self, key: &str) -> impl std::future::Future<Output = CacheResult<()>> + Send;

    /// Delete all keys matching a pattern, returning the count removed.
    /// Must be safe to call with zero matches.
    fn delete_pattern(
        &self,
        pattern: &str,
    ) -> impl std::future::Future<Output = CacheResult<u64>> + Send;

    /// Check if the cache backend is reachable and healthy.
    fn health_check(&self) -> impl std::future::Future<Output = CacheResult<bool>> + Send;

    /// Name of the cache provider, for logs and diagnostics.
    fn provider_name(&self) -> &'static str;
}
