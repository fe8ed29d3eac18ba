//! # Distributed Cache Module
//!
//! Namespaced key/value caching with TTL over pluggable providers, plus
//! the single-flight wrapper that keeps concurrent cache population from
//! stampeding the backends.
//!
//! ## Architecture
//!
//! ```text
//! SingleFlightCache            <- cached(key, producer, ttl); one
//!   └── CacheStore                producer execution per key per miss
//!         └── CacheProvider    <- enum dispatch, graceful degradation
//!               ├── Redis      <- ConnectionManager-based async Redis
//!               ├── Memory     <- in-process Moka cache
//!               ├── Failing    <- always-error fault injection
//!               └── NoOp       <- always-miss, always-succeed fallback
//! ```
//!
//! ## Design decisions
//!
//! - Cache failures are soft everywhere: reads fail open to a miss,
//!   writes are best-effort and only logged. A broken cache slows the
//!   system down; it never breaks a request.
//! - Pattern deletion uses SCAN, never KEYS.
//! - Producer failures are shared with concurrent waiters of the same
//!   key but never cached, so a failed population cannot poison a key.

pub mod errors;
pub mod keys;
pub mod provider;
pub mod providers;
pub mod single_flight;
pub mod store;
pub mod traits;

pub use errors::{CacheError, CacheResult};
pub use keys::{generate_cache_key, CacheNamespace};
pub use provider::CacheProvider;
pub use single_flight::SingleFlightCache;
pub use store::CacheStore;
pub use traits::CacheService;

pub use providers::{FailingCache, NoOpCache};

#[cfg(feature = "cache-moka")]
pub use providers::MemoryCache;

#[cfg(feature = "cache-redis")]
pub use providers::RedisCache;
