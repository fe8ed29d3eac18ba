//! Pool registry behavior: the pool-per-identity singleton guarantee and
//! connect-attempt sharing.

mod common;

use common::{MockBackend, TEST_IDENTITY};
use helix_core::{ManagedPool, PoolRegistry};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Concurrent first-time `get_pool` calls for one identity share a
/// single connect attempt and receive the same pool instance.
#[tokio::test(start_paused = true)]
async fn concurrent_first_use_shares_one_connect() {
    let backend = MockBackend::with_connect_delay(50);
    let state = backend.state.clone();
    let registry = Arc::new(PoolRegistry::new(backend));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            registry.get_pool(TEST_IDENTITY).await.unwrap()
        }));
    }

    let mut pools = Vec::new();
    for task in tasks {
        pools.push(task.await.unwrap());
    }

    assert_eq!(state.connect_count.load(Ordering::SeqCst), 1);
    for pool in &pools[1..] {
        assert!(Arc::ptr_eq(&pools[0], pool));
    }
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn distinct_identities_get_distinct_pools() {
    let backend = MockBackend::new();
    let state = backend.state.clone();
    let registry = PoolRegistry::new(backend);

    let a = registry
        .get_pool("Server=tcp:alpha,5432;Database=a")
        .await
        .unwrap();
    let b = registry
        .get_pool("Server=tcp:beta,5432;Database=b")
        .await
        .unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(state.connect_count.load(Ordering::SeqCst), 2);
    assert_eq!(registry.len(), 2);
}

#[tokio::test]
async fn repeat_calls_reuse_the_registered_pool() {
    let backend = MockBackend::new();
    let state = backend.state.clone();
    let registry = PoolRegistry::new(backend);

    let first = registry.get_pool(TEST_IDENTITY).await.unwrap();
    let second = registry.get_pool(TEST_IDENTITY).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(state.connect_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn eviction_forces_a_fresh_pool() {
    let backend = MockBackend::new();
    let registry = PoolRegistry::new(backend);

    let first = registry.get_pool(TEST_IDENTITY).await.unwrap();
    registry.evict(TEST_IDENTITY).await;
    assert!(registry.is_empty());

    let second = registry.get_pool(TEST_IDENTITY).await.unwrap();
    assert!(second.generation() > first.generation());
}

#[tokio::test]
async fn disconnected_pool_is_replaced_on_next_get() {
    let backend = MockBackend::new();
    let registry = PoolRegistry::new(backend);

    let first = registry.get_pool(TEST_IDENTITY).await.unwrap();
    first.disconnect();

    let second = registry.get_pool(TEST_IDENTITY).await.unwrap();
    assert!(second.generation() > first.generation());
    assert!(second.is_connected());
}

#[tokio::test]
async fn failed_connect_propagates_and_registers_nothing() {
    let backend = MockBackend::new();
    backend.state.fail_connects.store(1, Ordering::SeqCst);
    let registry = PoolRegistry::new(backend);

    let err = registry.get_pool(TEST_IDENTITY).await.unwrap_err();
    assert!(err.is_transient());
    assert!(registry.is_empty());

    // The pending-connect entry is gone, so the next call starts fresh
    // and succeeds.
    let pool = registry.get_pool(TEST_IDENTITY).await.unwrap();
    assert!(pool.is_connected());
}

#[tokio::test]
async fn malformed_identity_is_a_configuration_error() {
    let registry = PoolRegistry::new(MockBackend::new());
    let err = registry.get_pool("not-a-descriptor").await.unwrap_err();
    assert!(matches!(err, helix_core::HelixError::Configuration(_)));
    let err = registry.get_pool("").await.unwrap_err();
    assert!(matches!(err, helix_core::HelixError::Configuration(_)));
}
