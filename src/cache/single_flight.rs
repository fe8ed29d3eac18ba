//! Single-flight cache population.
//!
//! The stampede problem: N concurrent requests miss on the same key and
//! each re-runs the same expensive query. [`SingleFlightCache::cached`]
//! guarantees that among concurrent callers of one key, the producer runs
//! exactly once; everyone else awaits the shared in-flight computation
//! and receives the same result.
//!
//! The in-flight entry is removed when the computation settles, success
//! or failure, so a failed population never poisons the key: the next
//! caller simply retries the producer. Cache-layer failures (unreachable
//! store, undecodable payloads, abandoned leaders) always degrade to
//! calling the producer directly rather than failing the caller.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cache::keys::{generate_cache_key, CacheNamespace};
use crate::cache::store::CacheStore;
use crate::errors::{HelixError, HelixResult};

/// Outcome shared between the leader and its waiters. `HelixError` is
/// `Clone`, so one failure fans out to every caller of the round.
type FlightOutcome = Result<Value, HelixError>;
type FlightWatch = watch::Receiver<Option<FlightOutcome>>;

/// Cache store wrapped with per-key population deduplication.
#[derive(Debug)]
pub struct SingleFlightCache {
    store: CacheStore,
    in_flight: DashMap<String, FlightWatch>,
}

enum FlightRole {
    Leader(watch::Sender<Option<FlightOutcome>>),
    Follower(FlightWatch),
}

/// Removes the in-flight entry when the leader settles or is dropped
/// mid-computation, so a crashed population cannot wedge the key.
struct FlightGuard<'a> {
    in_flight: &'a DashMap<String, FlightWatch>,
    key: &'a str,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(self.key);
    }
}

impl SingleFlightCache {
    pub fn new(store: CacheStore) -> Self {
        Self {
            store,
            in_flight: DashMap::new(),
        }
    }

    /// The underlying store, for direct reads and invalidation.
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Return the cached value for `key`, or compute it with `producer`
    /// exactly once across concurrent callers and cache the result.
    ///
    /// Producer failures are shared with the waiters of the current
    /// round, never cached, and never suppressed.
    pub async fn cached<T, F, Fut>(&self, key: &str, ttl: Duration, producer: F) -> HelixResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = HelixResult<T>>,
    {
        if let Some(hit) = self.store.get_json::<T>(key).await {
            debug!(key = key, "Cache hit");
            return Ok(hit);
        }

        // Miss: join the in-flight computation for this key or become
        // its leader. The map entry guard drops before any await.
        let role = match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(entry) => FlightRole::Follower(entry.get().clone()),
            Entry::Vacant(slot) => {
                let (tx, rx) = watch::channel(None);
                slot.insert(rx);
                FlightRole::Leader(tx)
            }
        };

        match role {
            FlightRole::Follower(rx) => self.follow(key, rx, producer).await,
            FlightRole::Leader(tx) => self.lead(key, ttl, tx, producer).await,
        }
    }

    /// Run the producer, cache a success, then broadcast to waiters.
    async fn lead<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        tx: watch::Sender<Option<FlightOutcome>>,
        producer: F,
    ) -> HelixResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = HelixResult<T>>,
    {
        let guard = FlightGuard {
            in_flight: &self.in_flight,
            key,
        };

        debug!(key = key, "Cache miss; executing producer");
        let result = producer().await;

        let outcome: FlightOutcome = match &result {
            Ok(value) => match serde_json::to_value(value) {
                Ok(payload) => Ok(payload),
                Err(err) => {
                    warn!(key = key, error = %err, "Producer result not serializable; waiters will fetch directly");
                    Err(HelixError::CacheUnavailable(format!(
                        "producer result for {key} could not be shared: {err}"
                    )))
                }
            },
            Err(err) => Err(err.clone()),
        };

        if let Ok(payload) = &outcome {
            // Best-effort write; the store logs failures.
            self.store.set_value(key, payload, ttl).await;
        }

        // Entry comes out of the map before waiters wake, so callers
        // arriving after settlement start a fresh round.
        drop(guard);
        let _ = tx.send(Some(outcome));
        result
    }

    /// Await the leader's broadcast and share its outcome.
    async fn follow<T, F, Fut>(&self, key: &str, mut rx: FlightWatch, producer: F) -> HelixResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = HelixResult<T>>,
    {
        debug!(key = key, "Awaiting in-flight computation");

        let shared: FlightOutcome = match rx.wait_for(|outcome| outcome.is_some()).await {
            Ok(settled) => match settled.as_ref() {
                Some(outcome) => outcome.clone(),
                None => Err(HelixError::CacheUnavailable(
                    "in-flight computation settled empty".to_string(),
                )),
            },
            Err(_) => Err(HelixError::CacheUnavailable(
                "in-flight computation was abandoned".to_string(),
            )),
        };

        match shared {
            Ok(payload) => match serde_json::from_value::<T>(payload) {
                Ok(value) => Ok(value),
                Err(err) => {
                    warn!(key = key, error = %err, "Shared result shape mismatch; fetching directly");
                    producer().await
                }
            },
            // Sharing broke down (leader abandoned, unserializable
            // payload): fall back to a direct fetch rather than failing.
            Err(HelixError::CacheUnavailable(reason)) => {
                debug!(key = key, reason = %reason, "Falling back to direct fetch");
                producer().await
            }
            // A real producer failure is shared verbatim.
            Err(err) => Err(err),
        }
    }

    /// [`Self::cached`] with a key built from namespace, kind, and
    /// sanitized parameters.
    pub async fn cached_keyed<T, F, Fut>(
        &self,
        namespace: CacheNamespace,
        kind: &str,
        params: &[&str],
        ttl: Duration,
        producer: F,
    ) -> HelixResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = HelixResult<T>>,
    {
        let key = generate_cache_key(namespace, kind, params);
        self.cached(&key, ttl, producer).await
    }
}

#[cfg(all(test, feature = "cache-moka"))]
mod tests {
    use super::*;
    use crate::cache::provider::CacheProvider;
    use crate::cache::providers::MemoryCache;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn memory_flight() -> SingleFlightCache {
        SingleFlightCache::new(CacheStore::new(CacheProvider::Memory(Box::new(
            MemoryCache::new(100, Duration::from_secs(60)),
        ))))
    }

    #[tokio::test]
    async fn hit_skips_producer() {
        let cache = memory_flight();
        let calls = Arc::new(AtomicU64::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let value: u64 = cache
                .cached("hc:wip:team", Duration::from_secs(60), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_population_does_not_poison_the_key() {
        let cache = memory_flight();

        let err = cache
            .cached::<u64, _, _>("hc:wip:x", Duration::from_secs(60), || async {
                Err(HelixError::fatal("backend exploded"))
            })
            .await
            .unwrap_err();
        assert_eq!(err, HelixError::fatal("backend exploded"));
        assert!(cache.in_flight.is_empty());

        // Next caller retries the producer rather than seeing a cached
        // error.
        let value: u64 = cache
            .cached("hc:wip:x", Duration::from_secs(60), || async { Ok(9) })
            .await
            .unwrap();
        assert_eq!(value, 9);
    }

    #[tokio::test]
    async fn in_flight_entry_removed_after_success() {
        let cache = memory_flight();
        let _: u64 = cache
            .cached("hc:wip:y", Duration::from_secs(60), || async { Ok(1) })
            .await
            .unwrap();
        assert!(cache.in_flight.is_empty());
    }

    #[tokio::test]
    async fn unreachable_store_still_returns_producer_result() {
        let cache = SingleFlightCache::new(CacheStore::new(CacheProvider::failing()));
        let value: u64 = cache
            .cached("hc:wip:z", Duration::from_secs(60), || async { Ok(11) })
            .await
            .unwrap();
        assert_eq!(value, 11);
    }

    #[tokio::test]
    async fn keyed_helper_builds_namespaced_keys() {
        let cache = memory_flight();
        let _: u64 = cache
            .cached_keyed(
                CacheNamespace::Core,
                "enquiries",
                &["Team A"],
                Duration::from_secs(60),
                || async { Ok(3) },
            )
            .await
            .unwrap();

        let direct: Option<u64> = cache.store().get_json("hc:enquiries:team-a").await;
        assert_eq!(direct, Some(3));
    }
}
