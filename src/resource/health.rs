//! Background pool health monitoring.
//!
//! TCP half-open connections look healthy until a request dies on them.
//! The monitor sweeps all registered pools on a fixed interval,
//! independent of request traffic: pools that report disconnected are
//! evicted immediately, and the rest must answer a no-op probe within a
//! short timeout or be closed and evicted.
//!
//! The monitor is a supervised task bound to the manager's lifetime:
//! started with the registry handle, stopped via [`HealthMonitor::shutdown`],
//! and isolated so a failing probe can never take the loop down.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::HealthConfig;
use crate::resource::backend::{ManagedPool, ResourceBackend};
use crate::resource::descriptor::redact_identity;
use crate::resource::registry::PoolRegistry;

/// Handle to the background health sweep.
#[derive(Debug)]
pub struct HealthMonitor {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl HealthMonitor {
    /// Spawn the sweep loop against `registry`.
    pub fn start<B: ResourceBackend>(registry: Arc<PoolRegistry<B>>, config: HealthConfig) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it so startup is not
            // spent probing pools that were created moments ago.
            ticker.tick().await;

            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        sweep(&registry, config.probe_timeout).await;
                    }
                }
            }
            debug!("Health monitor stopped");
        });

        Self { shutdown, handle }
    }

    /// Signal the loop to stop and wait for it to finish. A panicked
    /// sweep is contained here rather than propagated.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

async fn sweep<B: ResourceBackend>(registry: &PoolRegistry<B>, probe_timeout: Duration) {
    let identities = registry.identities();
    debug!(pools = identities.len(), "Health sweep starting");

    for identity in identities {
        let Some(pool) = registry.registered(&identity) else {
            continue;
        };

        if !pool.is_connected() {
            warn!(
                backend = %redact_identity(&identity),
                "Pool reports disconnected; evicting"
            );
            registry.evict(&identity).await;
            continue;
        }

        match tokio::time::timeout(probe_timeout, pool.probe()).await {
            Ok(Ok(())) => {
                debug!(backend = %redact_identity(&identity), "Pool healthy");
            }
            Ok(Err(err)) => {
                warn!(
                    backend = %redact_identity(&identity),
                    error = %err,
                    "Health probe failed; evicting pool"
                );
                registry.evict(&identity).await;
            }
            Err(_) => {
                warn!(
                    backend = %redact_identity(&identity),
                    timeout_ms = probe_timeout.as_millis() as u64,
                    "Health probe timed out; evicting pool"
                );
                registry.evict(&identity).await;
            }
        }
    }
}
