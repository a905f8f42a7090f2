//! Key/value result store for the evetrade ESI aggregator.
//!
//! Holds two kinds of entries: TTL-governed structured results (operation
//! results wrapped in a [`CachedPayload`] envelope) and raw string values
//! (ETags, cached response bodies) whose expiry is owned by the caller.
//! Backends are pluggable behind the [`CacheStore`] trait; an in-memory
//! backend serves tests and local runs, Redis backs production.
use async_trait::async_trait;
use thiserror::Error;

pub mod backends;
pub mod entry;

pub use backends::{InMemoryCacheStore, RedisCacheStore};
pub use entry::{CacheEntry, CachedPayload};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    #[error("Redis error")]
    Redis(#[from] rustis::Error),
}

/// Contract for the persistent result store.
///
/// `get` must return `None` whenever `is_valid` is false, even if stale data
/// physically exists; stale entries are invisible, not deleted. `set` always
/// overwrites the value together with its freshness timestamp. Raw-value
/// operations bypass TTL validity entirely.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Whether a fresh entry exists for this key.
    async fn is_valid(&self, key: &str) -> Result<bool, StoreError>;

    /// Fetch a fresh entry's payload, `None` if missing or expired.
    async fn get(&self, key: &str) -> Result<Option<CachedPayload>, StoreError>;

    /// Store a payload, resetting its freshness timestamp.
    async fn set(
        &self,
        key: &str,
        payload: CachedPayload,
        ttl_hours: f64,
    ) -> Result<(), StoreError>;

    /// Remove one entry, or every entry in the store's namespace when `None`.
    async fn clear(&self, key: Option<&str>) -> Result<(), StoreError>;

    /// Fetch a raw string value, ignoring TTL bookkeeping.
    async fn get_raw_value(&self, key: &str)
        -> Result<Option<String>, StoreError>;

    /// Store a raw string value with no TTL.
    async fn set_raw_value(&self, key: &str, value: &str)
        -> Result<(), StoreError>;

    /// Remove a raw string value.
    async fn clear_raw_value(&self, key: &str) -> Result<(), StoreError>;
}
