//! Shared test fixtures: a scripted backend for exercising the pool
//! registry, retry loop, and gate without a live database.

#![allow(dead_code)] // not every test binary uses every fixture

use helix_core::{
    BackendDescriptor, HelixError, HelixResult, ManagedPool, ResourceBackend, ResourceConfig,
    RetryConfig,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A descriptor string that parses cleanly; the mock never dials it.
pub const TEST_IDENTITY: &str =
    "Server=tcp:mock-backend,5432;Initial Catalog=test;User ID=app;Password=pw";

/// Observable, scriptable backend state shared with the test body.
#[derive(Debug, Default)]
pub struct MockState {
    /// Successful and failed connect attempts so far.
    pub connect_count: AtomicU64,
    /// Fail this many upcoming connect attempts with a transient error.
    pub fail_connects: AtomicU64,
    /// Artificial connect latency in milliseconds.
    pub connect_delay_ms: AtomicU64,
}

#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_delay(ms: u64) -> Self {
        let backend = Self::default();
        backend.state.connect_delay_ms.store(ms, Ordering::SeqCst);
        backend
    }
}

/// A fake pool carrying the generation number of the connect attempt
/// that produced it, so tests can prove eviction created a new pool.
#[derive(Debug)]
pub struct MockPool {
    generation: u64,
    connected: AtomicBool,
}

impl MockPool {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl ManagedPool for MockPool {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn probe(&self) -> HelixResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(HelixError::transient(
                "conn_closed",
                "mock pool disconnected",
            ))
        }
    }

    async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl ResourceBackend for MockBackend {
    type Pool = MockPool;

    async fn connect(&self, _descriptor: &BackendDescriptor) -> HelixResult<MockPool> {
        let delay = self.state.connect_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let generation = self.state.connect_count.fetch_add(1, Ordering::SeqCst) + 1;

        if self.state.fail_connects.load(Ordering::SeqCst) > 0 {
            self.state.fail_connects.fetch_sub(1, Ordering::SeqCst);
            return Err(HelixError::transient(
                "conn_refused",
                "mock connect failure",
            ));
        }

        Ok(MockPool {
            generation,
            connected: AtomicBool::new(true),
        })
    }
}

/// Fast-backoff config for tests; individual tests override fields.
pub fn test_config() -> ResourceConfig {
    ResourceConfig {
        retry: RetryConfig {
            max_attempts: 3,
            backoff_base: Duration::from_millis(10),
            backoff_jitter: Duration::ZERO,
        },
        ..ResourceConfig::default()
    }
}
