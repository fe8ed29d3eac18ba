//! Resource-access façade.
//!
//! [`ResourceManager::with_resource`] is the public entry point for every
//! pooled backend operation: acquire a concurrency slot, obtain the pool
//! for the identity, run the unit of work under the request timeout, and
//! retry transient failures with pool recreation and backoff. The slot is
//! held for the whole retry loop and released exactly once when the guard
//! drops, on every exit path.
//!
//! The manager owns all shared state (registry, gate, counters, health
//! monitor) behind constructor injection; there are no module-level
//! globals and teardown is explicit via [`ResourceManager::shutdown`].

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::ResourceConfig;
use crate::errors::{HelixError, HelixResult};
use crate::resource::backend::{ManagedPool, PostgresBackend, ResourceBackend};
use crate::resource::descriptor::redact_identity;
use crate::resource::gate::ConcurrencyGate;
use crate::resource::health::HealthMonitor;
use crate::resource::registry::PoolRegistry;
use crate::resource::retry::RetryPolicy;

const METRICS_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Combined façade over registry, gate, retry policy, and health monitor.
pub struct ResourceManager<B: ResourceBackend> {
    registry: Arc<PoolRegistry<B>>,
    gate: Arc<ConcurrencyGate>,
    retry: RetryPolicy,
    request_timeout: Duration,
    monitor: Mutex<Option<HealthMonitor>>,
    stats: ManagerStats,
}

#[derive(Debug, Default)]
struct ManagerStats {
    total_requests: AtomicU64,
    total_errors: AtomicU64,
    busy_timeouts: AtomicU64,
    last_logged: Mutex<Option<Instant>>,
}

impl ResourceManager<PostgresBackend> {
    /// Production manager over SQLx Postgres.
    pub fn postgres(config: ResourceConfig) -> HelixResult<Self> {
        config.validate()?;
        let backend = PostgresBackend::new(&config);
        Ok(Self::with_backend(backend, config))
    }
}

impl<B: ResourceBackend> ResourceManager<B> {
    /// Build a manager over an arbitrary backend and start the health
    /// monitor. Must be called from within a tokio runtime.
    pub fn with_backend(backend: B, config: ResourceConfig) -> Self {
        let registry = Arc::new(PoolRegistry::new(backend));
        let gate = Arc::new(ConcurrencyGate::new(
            config.max_concurrent_ops,
            config.queue_timeout,
        ));
        let monitor = HealthMonitor::start(registry.clone(), config.health.clone());

        Self {
            registry,
            gate,
            retry: RetryPolicy::new(config.retry.clone()),
            request_timeout: config.request_timeout,
            monitor: Mutex::new(Some(monitor)),
            stats: ManagerStats::default(),
        }
    }

    /// Run `work` against the pool for `identity`, retrying transient
    /// failures per the retry policy.
    ///
    /// `work` is invoked once per attempt with a shared pool handle; it
    /// must be cheap to call repeatedly. A queue timeout on the gate
    /// surfaces as [`HelixError::Busy`] immediately and is never retried.
    pub async fn with_resource<T, F, Fut>(&self, identity: &str, work: F) -> HelixResult<T>
    where
        F: Fn(Arc<B::Pool>) -> Fut,
        Fut: Future<Output = HelixResult<T>>,
    {
        self.stats.total_requests.fetch_add(1, Ordering::Relaxed);

        let slot = match self.gate.acquire().await {
            Ok(slot) => slot,
            Err(err) => {
                self.stats.busy_timeouts.fetch_add(1, Ordering::Relaxed);
                self.stats.total_errors.fetch_add(1, Ordering::Relaxed);
                warn!(
                    backend = %redact_identity(identity),
                    "Resource gate queue timed out"
                );
                self.maybe_log_metrics();
                return Err(err);
            }
        };

        let result = self.run_attempts(identity, work).await;
        drop(slot);

        if result.is_err() {
            self.stats.total_errors.fetch_add(1, Ordering::Relaxed);
        }
        self.maybe_log_metrics();
        result
    }

    async fn run_attempts<T, F, Fut>(&self, identity: &str, work: F) -> HelixResult<T>
    where
        F: Fn(Arc<B::Pool>) -> Fut,
        Fut: Future<Output = HelixResult<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match self.attempt_once(identity, &work).await {
                Ok(value) => return Ok(value),
                Err(err) if self.retry.should_retry(&err, attempt) => {
                    // Replace the pool wholesale; half-broken pools are
                    // never repaired in place.
                    self.registry.evict(identity).await;
                    let delay = self.retry.backoff(attempt);
                    self.retry.log_retry(identity, &err, attempt, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                // Fatal faults and exhausted retries propagate the
                // original error unchanged.
                Err(err) => return Err(err),
            }
        }
    }

    async fn attempt_once<T, F, Fut>(&self, identity: &str, work: &F) -> HelixResult<T>
    where
        F: Fn(Arc<B::Pool>) -> Fut,
        Fut: Future<Output = HelixResult<T>>,
    {
        let pool = self.registry.get_pool(identity).await?;

        if !pool.is_connected() {
            return Err(HelixError::transient(
                "conn_closed",
                "pool is disconnected",
            ));
        }

        match tokio::time::timeout(self.request_timeout, work(pool)).await {
            Ok(result) => result,
            Err(_) => Err(HelixError::transient(
                "timeout",
                format!(
                    "unit of work did not complete within {:?}",
                    self.request_timeout
                ),
            )),
        }
    }

    /// The pool registry, shared with the health monitor.
    pub fn registry(&self) -> &Arc<PoolRegistry<B>> {
        &self.registry
    }

    /// Current gate utilization and counters.
    pub fn gate_snapshot(&self) -> crate::resource::gate::GateSnapshot {
        self.gate.snapshot()
    }

    /// Stop the health monitor and close every pool.
    pub async fn shutdown(&self) {
        let monitor = self.monitor.lock().take();
        if let Some(monitor) = monitor {
            monitor.shutdown().await;
        }
        self.registry.close_all().await;
        info!("Resource manager shut down");
    }

    /// Log request counters and gate utilization, at most once per
    /// minute.
    fn maybe_log_metrics(&self) {
        {
            let mut last = self.stats.last_logged.lock();
            match *last {
                Some(at) if at.elapsed() < METRICS_LOG_INTERVAL => return,
                _ => *last = Some(Instant::now()),
            }
        }

        let gate = self.gate.snapshot();
        info!(
            total_requests = self.stats.total_requests.load(Ordering::Relaxed),
            total_errors = self.stats.total_errors.load(Ordering::Relaxed),
            busy_timeouts = self.stats.busy_timeouts.load(Ordering::Relaxed),
            gate_in_use = gate.in_use,
            gate_capacity = gate.capacity,
            gate_max_wait_us = gate.max_wait_us,
            pools = self.registry.len(),
            "Resource manager metrics"
        );
    }
}
