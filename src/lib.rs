#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Helix Core Rust
//!
//! Shared resource-access core for the Helix practice-management backend.
//!
//! ## Overview
//!
//! Every route handler in the backend ultimately funnels into one of two
//! operations: run a unit of work against a pooled SQL connection, or
//! populate-or-read a cached value. This crate owns both paths and the
//! resilience machinery around them, so that many concurrent HTTP requests
//! can be multiplexed safely over a small number of expensive, fault-prone
//! WAN connections without cache stampedes or connection exhaustion.
//!
//! ## Architecture
//!
//! - [`resource`] - pooled SQL access: per-backend pool registry, a global
//!   FIFO concurrency gate, transient-fault retry with pool recreation,
//!   and a supervised background health monitor, combined behind
//!   [`resource::ResourceManager::with_resource`]
//! - [`cache`] - namespaced key/value caching with TTL over pluggable
//!   providers, plus the single-flight wrapper
//!   [`cache::SingleFlightCache::cached`] that deduplicates concurrent
//!   cache population
//! - [`config`] - typed, validated configuration with environment
//!   overrides
//! - [`errors`] - structured error taxonomy shared by both paths
//! - [`logging`] - structured logging initialization
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use helix_core::{ResourceConfig, ResourceManager};
//!
//! # async fn example() -> Result<(), helix_core::HelixError> {
//! let manager = ResourceManager::postgres(ResourceConfig::from_environment())?;
//!
//! let row_count: i64 = manager
//!     .with_resource(
//!         "Server=tcp:db.example.com,5432;Initial Catalog=core;User ID=app;Password=secret",
//!         |pool| async move {
//!             let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM enquiries")
//!                 .fetch_one(pool.pool())
//!                 .await?;
//!             Ok(row.0)
//!         },
//!     )
//!     .await?;
//! # let _ = row_count;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod errors;
pub mod logging;
pub mod resource;

pub use cache::{generate_cache_key, CacheNamespace, CacheProvider, CacheStore, SingleFlightCache};
pub use config::{
    CacheConfig, CacheTtlConfig, Dataset, HealthConfig, PoolConfig, ResourceConfig, RetryConfig,
};
pub use errors::{HelixError, HelixResult};
pub use resource::{
    BackendDescriptor, ConcurrencyGate, HealthMonitor, ManagedPool, PoolRegistry, PostgresBackend,
    PostgresPool, ResourceBackend, ResourceManager, RetryPolicy, SlotGuard,
};
