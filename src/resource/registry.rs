//! Connection pool registry.
//!
//! Maps pool identity (the raw descriptor string) to a shared pool,
//! created on demand. At most one pool object exists per identity at any
//! instant, and concurrent first-time requests for the same identity
//! share a single connect attempt instead of racing one each.
//!
//! New pools are validated with a no-op query before registration; a pool
//! that connects but cannot answer is discarded rather than registered
//! half-working.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::{HelixError, HelixResult};
use crate::resource::backend::{ManagedPool, ResourceBackend};
use crate::resource::descriptor::{redact_identity, BackendDescriptor};

type ConnectResult<P> = HelixResult<Arc<P>>;
type ConnectWatch<P> = watch::Receiver<Option<ConnectResult<P>>>;

/// Registry of one pool per backend identity.
pub struct PoolRegistry<B: ResourceBackend> {
    backend: B,
    pools: DashMap<String, Arc<B::Pool>>,
    /// Pending connect attempts keyed by identity; cleared when the
    /// attempt settles so a failure never wedges the identity.
    connecting: DashMap<String, ConnectWatch<B::Pool>>,
}

enum ConnectRole<P: ManagedPool> {
    Leader(watch::Sender<Option<ConnectResult<P>>>),
    Follower(ConnectWatch<P>),
}

/// Removes the pending-connect entry when the leader settles or is
/// dropped mid-attempt, so followers and later callers never wait on a
/// dead attempt.
struct PendingConnectGuard<'a, P: ManagedPool> {
    connecting: &'a DashMap<String, ConnectWatch<P>>,
    identity: &'a str,
}

impl<P: ManagedPool> Drop for PendingConnectGuard<'_, P> {
    fn drop(&mut self) {
        self.connecting.remove(self.identity);
    }
}

impl<B: ResourceBackend> PoolRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            pools: DashMap::new(),
            connecting: DashMap::new(),
        }
    }

    /// Get the healthy pool for `identity`, creating it if needed.
    pub async fn get_pool(&self, identity: &str) -> ConnectResult<B::Pool> {
        if identity.trim().is_empty() {
            return Err(HelixError::Configuration(
                "backend identity is empty".to_string(),
            ));
        }

        if let Some(pool) = self.pools.get(identity) {
            if pool.is_connected() {
                return Ok(pool.clone());
            }
        }

        // Join an outstanding connect attempt or become its leader. The
        // entry guard is dropped before any await.
        let role = match self.connecting.entry(identity.to_string()) {
            Entry::Occupied(entry) => ConnectRole::Follower(entry.get().clone()),
            Entry::Vacant(slot) => {
                let (tx, rx) = watch::channel(None);
                slot.insert(rx);
                ConnectRole::Leader(tx)
            }
        };

        match role {
            ConnectRole::Follower(mut rx) => {
                debug!(
                    backend = %redact_identity(identity),
                    "Joining outstanding connect attempt"
                );
                match rx.wait_for(|result| result.is_some()).await {
                    Ok(settled) => match settled.as_ref() {
                        Some(result) => result.clone(),
                        None => Err(HelixError::transient(
                            "conn_aborted",
                            "connect attempt settled without a result",
                        )),
                    },
                    Err(_) => Err(HelixError::transient(
                        "conn_aborted",
                        "connect attempt was abandoned before completing",
                    )),
                }
            }
            ConnectRole::Leader(tx) => {
                let guard = PendingConnectGuard {
                    connecting: &self.connecting,
                    identity,
                };
                let result = self.connect_identity(identity).await;
                drop(guard);
                let _ = tx.send(Some(result.clone()));
                result
            }
        }
    }

    async fn connect_identity(&self, identity: &str) -> ConnectResult<B::Pool> {
        // Close any half-open pool before reconnecting; errors ignored.
        if let Some((_, stale)) = self.pools.remove(identity) {
            debug!(
                backend = %redact_identity(identity),
                "Closing stale pool before reconnect"
            );
            stale.close().await;
        }

        let descriptor = BackendDescriptor::parse(identity)?;
        let pool = self.backend.connect(&descriptor).await?;

        // Validate with a no-op query before registering.
        if let Err(err) = pool.probe().await {
            warn!(
                backend = %descriptor.redacted(),
                error = %err,
                "New pool failed validation; discarding"
            );
            pool.close().await;
            return Err(err);
        }

        let pool = Arc::new(pool);
        self.pools.insert(identity.to_string(), pool.clone());
        info!(backend = %descriptor.redacted(), "Connection pool registered");
        Ok(pool)
    }

    /// Close and deregister the pool for `identity`, forcing recreation
    /// on the next call. Safe to call for unknown identities.
    pub async fn evict(&self, identity: &str) {
        if let Some((_, pool)) = self.pools.remove(identity) {
            debug!(backend = %redact_identity(identity), "Evicting pool");
            pool.close().await;
        }
    }

    /// Peek at a registered pool without triggering a connect.
    pub fn registered(&self, identity: &str) -> Option<Arc<B::Pool>> {
        self.pools.get(identity).map(|pool| pool.clone())
    }

    /// Identities with a registered pool.
    pub fn identities(&self) -> Vec<String> {
        self.pools.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of registered pools.
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Close every registered pool. Used at shutdown.
    pub async fn close_all(&self) {
        for identity in self.identities() {
            self.evict(&identity).await;
        }
    }
}
