//! # Resource Access Module
//!
//! Pooled SQL access with admission control and fault recovery. Route
//! handlers call [`ResourceManager::with_resource`] with an opaque backend
//! descriptor and a unit of work; everything else here exists to make that
//! call safe under load:
//!
//! - [`registry::PoolRegistry`] - one lazily created pool per backend
//!   identity, shared by all callers, with connect-attempt deduplication
//! - [`gate::ConcurrencyGate`] - a global FIFO cap on simultaneous
//!   resource operations with a bounded wait queue
//! - [`retry`] - transient-fault classification and exponential backoff
//!   with jitter, recreating the pool between attempts
//! - [`health::HealthMonitor`] - a supervised background sweep that
//!   evicts silently broken pools
//!
//! The registry and manager are generic over [`backend::ResourceBackend`];
//! production uses [`backend::PostgresBackend`] over SQLx.

pub mod backend;
pub mod descriptor;
pub mod gate;
pub mod health;
pub mod manager;
pub mod registry;
pub mod retry;

pub use backend::{ManagedPool, PostgresBackend, PostgresPool, ResourceBackend};
pub use descriptor::BackendDescriptor;
pub use gate::{ConcurrencyGate, GateSnapshot, SlotGuard};
pub use health::HealthMonitor;
pub use manager::ResourceManager;
pub use registry::PoolRegistry;
pub use retry::RetryPolicy;
