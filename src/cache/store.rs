//! Namespaced JSON cache store with soft-failure semantics.
//!
//! The store layers payload envelopes and the fail-open policy on top of
//! a [`CacheProvider`]: reads return `None` on miss *and* on any
//! infrastructure failure, so callers fall through to a fresh fetch
//! either way; writes are best-effort and only logged when they fail.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::keys::CacheNamespace;
use crate::cache::provider::CacheProvider;
use crate::config::CacheConfig;

/// Stored record shape: the payload plus when it was cached and for how
/// long. The metadata survives in the store for diagnostics even though
/// reads only hand back the payload.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    data: Value,
    cached_at: DateTime<Utc>,
    ttl_seconds: u64,
}

/// Cache store over a configured provider.
#[derive(Debug, Clone)]
pub struct CacheStore {
    provider: CacheProvider,
}

impl CacheStore {
    pub fn new(provider: CacheProvider) -> Self {
        Self { provider }
    }

    /// Build a store from configuration, degrading gracefully.
    pub async fn from_config(config: &CacheConfig) -> Self {
        Self::new(CacheProvider::from_config_graceful(config).await)
    }

    pub fn provider(&self) -> &CacheProvider {
        &self.provider
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_enabled()
    }

    /// Read and decode a cached value. Misses and infrastructure
    /// failures are indistinguishable by design: both return `None`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.provider.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(key = key, error = %err, "Cache read failed; treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<CacheEnvelope>(&raw) {
            Ok(envelope) => match serde_json::from_value::<T>(envelope.data) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(key = key, error = %err, "Cached payload shape mismatch; treating as miss");
                    None
                }
            },
            Err(err) => {
                warn!(key = key, error = %err, "Cache entry could not be decoded; treating as miss");
                None
            }
        }
    }

    /// Serialize and store a value under `key`. Best-effort: returns
    /// whether the write happened, never raises.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let payload = match serde_json::to_value(value) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(key = key, error = %err, "Cache payload could not be serialized; skipping write");
                return false;
            }
        };
        self.set_value(key, &payload, ttl).await
    }

    /// Store an already-serialized JSON payload under `key`.
    pub async fn set_value(&self, key: &str, payload: &Value, ttl: Duration) -> bool {
        let envelope = CacheEnvelope {
            data: payload.clone(),
            cached_at: Utc::now(),
            ttl_seconds: ttl.as_secs(),
        };
        let raw = match serde_json::to_string(&envelope) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key = key, error = %err, "Cache envelope could not be serialized; skipping write");
                return false;
            }
        };

        match self.provider.set(key, &raw, ttl).await {
            Ok(()) => {
                debug!(key = key, ttl_seconds = ttl.as_secs(), "Cache write");
                true
            }
            Err(err) => {
                warn!(key = key, error = %err, "Cache write failed");
                false
            }
        }
    }

    /// Delete one key. Best-effort.
    pub async fn delete(&self, key: &str) -> bool {
        match self.provider.delete(key).await {
            Ok(()) => true,
            Err(err) => {
                warn!(key = key, error = %err, "Cache delete failed");
                false
            }
        }
    }

    /// Delete all keys matching `pattern`, returning how many were
    /// removed. Safe with zero matches; failures report zero.
    pub async fn delete_pattern(&self, pattern: &str) -> u64 {
        match self.provider.delete_pattern(pattern).await {
            Ok(count) => count,
            Err(err) => {
                warn!(pattern = pattern, error = %err, "Cache pattern delete failed");
                0
            }
        }
    }

    /// Drop every cached entry of one kind within a namespace. Used for
    /// manual invalidation after writes.
    pub async fn invalidate(&self, namespace: CacheNamespace, kind: &str) -> u64 {
        self.delete_pattern(&format!("{}:{}:*", namespace.prefix(), kind))
            .await
    }

    /// Whether the backing store currently answers its health probe.
    pub async fn health_check(&self) -> bool {
        self.provider.health_check().await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Enquiry {
        id: u64,
        team: String,
    }

    #[cfg(feature = "cache-moka")]
    fn memory_store() -> CacheStore {
        use crate::cache::providers::MemoryCache;
        CacheStore::new(CacheProvider::Memory(Box::new(MemoryCache::new(
            100,
            Duration::from_secs(60),
        ))))
    }

    #[cfg(feature = "cache-moka")]
    #[tokio::test]
    async fn json_round_trip_preserves_payload() {
        let store = memory_store();
        let enquiry = Enquiry {
            id: 42,
            team: "commercial".to_string(),
        };

        assert!(store.set_json("hc:enquiries:42", &enquiry, Duration::from_secs(60)).await);
        let loaded: Option<Enquiry> = store.get_json("hc:enquiries:42").await;
        assert_eq!(loaded, Some(enquiry));
    }

    #[cfg(feature = "cache-moka")]
    #[tokio::test]
    async fn stored_entries_carry_envelope_metadata() {
        let store = memory_store();
        store
            .set_json("hc:wip:team", &vec![1, 2, 3], Duration::from_secs(300))
            .await;

        let raw = store.provider.get("hc:wip:team").await.unwrap().unwrap();
        let envelope: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(envelope["ttl_seconds"], 300);
        assert!(envelope["cached_at"].is_string());
        assert_eq!(envelope["data"], serde_json::json!([1, 2, 3]));
    }

    #[cfg(feature = "cache-moka")]
    #[tokio::test]
    async fn shape_mismatch_reads_as_miss() {
        let store = memory_store();
        store
            .set_json("hc:enquiries:1", &vec!["not", "an", "enquiry"], Duration::from_secs(60))
            .await;
        let loaded: Option<Enquiry> = store.get_json("hc:enquiries:1").await;
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn unreachable_store_reads_as_miss_and_writes_silently_fail() {
        let store = CacheStore::new(CacheProvider::failing());
        let loaded: Option<Enquiry> = store.get_json("hc:enquiries:1").await;
        assert!(loaded.is_none());
        assert!(!store.set_json("hc:enquiries:1", &7, Duration::from_secs(60)).await);
        assert_eq!(store.delete_pattern("hc:*").await, 0);
        assert!(!store.health_check().await);
    }

    #[cfg(feature = "cache-moka")]
    #[tokio::test]
    async fn invalidate_clears_one_kind_in_one_namespace() {
        let store = memory_store();
        store.set_json("hc:enquiries:a", &1, Duration::from_secs(60)).await;
        store.set_json("hc:enquiries:b", &2, Duration::from_secs(60)).await;
        store.set_json("hc:matters:a", &3, Duration::from_secs(60)).await;

        let removed = store.invalidate(CacheNamespace::Core, "enquiries").await;
        assert_eq!(removed, 2);
        assert!(store.get_json::<i32>("hc:matters:a").await.is_some());
    }
}
