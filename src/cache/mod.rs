//! Key-value store used for verification tokens, rate-limit counters and
//! cached third-party credentials.
//!
//! Every operation is atomic on a single key. Nothing here offers
//! multi-key transactions, and callers must not assume them.

pub mod memory_store;
pub mod redis_store;

use async_trait::async_trait;
use std::time::Duration;

pub use memory_store::InMemoryStore;
pub use redis_store::RedisStore;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Value stored at '{0}' is not an integer")]
    NotAnInteger(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Atomically add one to the integer at `key`, creating it at 1 with no
    /// expiry when absent. Returns the post-increment value.
    async fn increment(&self, key: &str) -> CacheResult<i64>;

    /// Set the remaining lifetime of an existing key.
    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<()>;

    /// Delete `key`. Returns whether a live entry was removed, so exactly
    /// one of several concurrent callers observes `true`.
    async fn evict(&self, key: &str) -> CacheResult<bool>;
}
