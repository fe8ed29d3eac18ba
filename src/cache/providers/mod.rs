//! Concrete cache provider implementations.

pub mod failing;
pub mod noop;

#[cfg(feature = "cache-moka")]
pub mod memory;

#[cfg(feature = "cache-redis")]
pub mod redis;

pub use failing::FailingCache;
pub use noop::NoOpCache;

#[cfg(feature = "cache-moka")]
pub use memory::MemoryCache;

#[cfg(feature = "cache-redis")]
pub use redis::RedisCache;
