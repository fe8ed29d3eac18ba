//! Backend abstraction and the production SQLx implementation.
//!
//! The registry and manager only need two capabilities from a backend:
//! create a pool for a parsed descriptor, and ask an existing pool about
//! its health. Both are expressed as traits so the retry and admission
//! machinery can be exercised against a scripted backend in tests.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::future::Future;
use std::time::Duration;
use tracing::info;

use crate::config::{PoolConfig, ResourceConfig};
use crate::errors::{HelixError, HelixResult};
use crate::resource::descriptor::BackendDescriptor;

/// A live set of connections to one backend target.
///
/// Pools are replaced, not repaired: when one is found unhealthy it is
/// closed and a fresh pool is created on the next attempt.
pub trait ManagedPool: Send + Sync + 'static {
    /// Whether the pool still considers itself connected.
    fn is_connected(&self) -> bool;

    /// Run a trivial no-op query against the backend.
    fn probe(&self) -> impl Future<Output = HelixResult<()>> + Send;

    /// Close all connections. Idempotent; errors are swallowed.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// Creates pools for one class of backend.
pub trait ResourceBackend: Send + Sync + 'static {
    type Pool: ManagedPool;

    /// Construct a pool and establish connectivity.
    fn connect(
        &self,
        descriptor: &BackendDescriptor,
    ) -> impl Future<Output = HelixResult<Self::Pool>> + Send;
}

/// Production backend over SQLx Postgres.
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool_config: PoolConfig,
    connect_timeout: Duration,
}

impl PostgresBackend {
    pub fn new(config: &ResourceConfig) -> Self {
        Self {
            pool_config: config.pool.clone(),
            connect_timeout: config.connect_timeout,
        }
    }
}

impl ResourceBackend for PostgresBackend {
    type Pool = PostgresPool;

    async fn connect(&self, descriptor: &BackendDescriptor) -> HelixResult<PostgresPool> {
        let connect = PgPoolOptions::new()
            .max_connections(self.pool_config.max_connections)
            .min_connections(self.pool_config.min_connections)
            .acquire_timeout(self.pool_config.acquire_timeout)
            .idle_timeout(Some(self.pool_config.idle_timeout))
            .max_lifetime(Some(self.pool_config.max_lifetime))
            .connect_with(descriptor.connect_options());

        let pool = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| {
                HelixError::transient(
                    "timeout",
                    format!(
                        "connect to {} did not complete within {:?}",
                        descriptor.redacted(),
                        self.connect_timeout
                    ),
                )
            })?
            .map_err(HelixError::from)?;

        info!(
            backend = %descriptor.redacted(),
            max_connections = self.pool_config.max_connections,
            min_connections = self.pool_config.min_connections,
            "Connection pool established"
        );

        Ok(PostgresPool { inner: pool })
    }
}

/// SQLx pool handle passed to units of work.
#[derive(Debug, Clone)]
pub struct PostgresPool {
    inner: PgPool,
}

impl PostgresPool {
    /// The underlying SQLx pool for running queries.
    #[inline]
    pub fn pool(&self) -> &PgPool {
        &self.inner
    }
}

impl ManagedPool for PostgresPool {
    fn is_connected(&self) -> bool {
        !self.inner.is_closed()
    }

    async fn probe(&self) -> HelixResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.inner)
            .await
            .map(|_| ())
            .map_err(HelixError::from)
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
