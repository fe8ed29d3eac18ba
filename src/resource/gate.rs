//! Global admission control for resource operations.
//!
//! The gate caps how many resource-access operations may be in flight at
//! once across *all* pools. Callers without an available slot queue in
//! strict FIFO order; each wait is bounded by the configured queue
//! timeout, after which the acquire fails with [`HelixError::Busy`]. The
//! gate never retries on behalf of the caller.
//!
//! The gate knows nothing about SQL, Redis, or any specific backend; it
//! is pure admission control over an abstract permit.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::errors::{HelixError, HelixResult};

/// FIFO concurrency gate with a bounded wait queue.
#[derive(Debug)]
pub struct ConcurrencyGate {
    // tokio's semaphore queues waiters fairly, which gives the strict
    // arrival-order guarantee callers rely on.
    semaphore: Arc<Semaphore>,
    capacity: usize,
    queue_timeout: Duration,
    stats: GateStats,
}

/// SWMR atomic counters; hot-path writers use relaxed ordering.
#[derive(Debug, Default)]
struct GateStats {
    total_acquires: AtomicU64,
    busy_timeouts: AtomicU64,
    total_wait_us: AtomicU64,
    max_wait_us: AtomicU64,
}

/// An admission permit. The slot is returned when the guard drops, so
/// release happens exactly once on every exit path.
#[derive(Debug)]
pub struct SlotGuard {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    pub fn new(capacity: usize, queue_timeout: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            queue_timeout,
            stats: GateStats::default(),
        }
    }

    /// Acquire a slot, waiting in FIFO order up to the queue timeout.
    pub async fn acquire(&self) -> HelixResult<SlotGuard> {
        let start = Instant::now();
        let acquired =
            tokio::time::timeout(self.queue_timeout, self.semaphore.clone().acquire_owned()).await;

        match acquired {
            Ok(Ok(permit)) => {
                let waited_us = start.elapsed().as_micros() as u64;
                self.stats.total_acquires.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .total_wait_us
                    .fetch_add(waited_us, Ordering::Relaxed);
                self.stats
                    .max_wait_us
                    .fetch_max(waited_us, Ordering::Relaxed);
                Ok(SlotGuard { _permit: permit })
            }
            Ok(Err(_)) => Err(HelixError::Busy(
                "concurrency gate has been closed".to_string(),
            )),
            Err(_) => {
                self.stats.busy_timeouts.fetch_add(1, Ordering::Relaxed);
                Err(HelixError::Busy(format!(
                    "no resource slot freed within {:?} ({} of {} in use)",
                    self.queue_timeout,
                    self.in_use(),
                    self.capacity
                )))
            }
        }
    }

    /// Slots currently held.
    pub fn in_use(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn queue_timeout(&self) -> Duration {
        self.queue_timeout
    }

    /// Take a snapshot of current gate statistics.
    pub fn snapshot(&self) -> GateSnapshot {
        let total_acquires = self.stats.total_acquires.load(Ordering::Relaxed);
        let total_wait_us = self.stats.total_wait_us.load(Ordering::Relaxed);
        let average_wait_us = if total_acquires > 0 {
            total_wait_us as f64 / total_acquires as f64
        } else {
            0.0
        };

        GateSnapshot {
            capacity: self.capacity,
            in_use: self.in_use(),
            total_acquires,
            busy_timeouts: self.stats.busy_timeouts.load(Ordering::Relaxed),
            average_wait_us,
            max_wait_us: self.stats.max_wait_us.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of gate statistics.
#[derive(Debug, Clone, Serialize)]
pub struct GateSnapshot {
    pub capacity: usize,
    pub in_use: usize,
    pub total_acquires: u64,
    pub busy_timeouts: u64,
    pub average_wait_us: f64,
    pub max_wait_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquires_up_to_capacity_without_waiting() {
        let gate = ConcurrencyGate::new(2, Duration::from_secs(1));
        let a = gate.acquire().await.unwrap();
        let b = gate.acquire().await.unwrap();
        assert_eq!(gate.in_use(), 2);
        drop(a);
        drop(b);
        assert_eq!(gate.in_use(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn queue_timeout_surfaces_busy() {
        let gate = ConcurrencyGate::new(1, Duration::from_millis(50));
        let held = gate.acquire().await.unwrap();

        let err = gate.acquire().await.unwrap_err();
        assert!(matches!(err, HelixError::Busy(_)));
        assert_eq!(gate.snapshot().busy_timeouts, 1);
        drop(held);
    }

    #[tokio::test]
    async fn released_slot_admits_waiter() {
        let gate = Arc::new(ConcurrencyGate::new(1, Duration::from_secs(5)));
        let held = gate.acquire().await.unwrap();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.acquire().await.map(|_| ()) })
        };
        tokio::task::yield_now().await;

        drop(held);
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn snapshot_tracks_acquires() {
        let gate = ConcurrencyGate::new(4, Duration::from_secs(1));
        let _slot = gate.acquire().await.unwrap();
        let snapshot = gate.snapshot();
        assert_eq!(snapshot.total_acquires, 1);
        assert_eq!(snapshot.in_use, 1);
        assert_eq!(snapshot.capacity, 4);
    }
}
