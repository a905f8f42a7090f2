//! In-memory implementation of the `CacheStore` trait. Entries are kept as
//! serialized JSON strings so the storage path matches the Redis backend.
use crate::{CacheEntry, CacheStore, CachedPayload, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct InMemoryCacheStore {
    entries: Mutex<HashMap<String, String>>,
    raw_values: Mutex<HashMap<String, String>>,
}

impl InMemoryCacheStore {
    /// Construct a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            raw_values: Mutex::new(HashMap::new()),
        }
    }

    fn load_entry(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        match entries.get(key) {
            Some(value) => {
                let entry = serde_json::from_str(value).map_err(|err| {
                    StoreError::Deserialization(err.to_string())
                })?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock().unwrap();
        let raw_values = self.raw_values.lock().unwrap();
        f.debug_struct("InMemoryCacheStore")
            .field("entries", &entries.len())
            .field("raw_values", &raw_values.len())
            .finish()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn is_valid(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.load_entry(key)?.map(|e| e.is_valid()).unwrap_or(false))
    }

    async fn get(&self, key: &str) -> Result<Option<CachedPayload>, StoreError> {
        // Stale entries stay in the map but are invisible to readers.
        match self.load_entry(key)? {
            Some(entry) if entry.is_valid() => Ok(Some(entry.payload)),
            _ => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        payload: CachedPayload,
        ttl_hours: f64,
    ) -> Result<(), StoreError> {
        let entry = CacheEntry::new(key, payload, ttl_hours);
        let value = serde_json::to_string(&entry)
            .map_err(|err| StoreError::Serialization(err.to_string()))?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn clear(&self, key: Option<&str>) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        match key {
            Some(key) => {
                entries.remove(key);
            }
            None => {
                entries.clear();
                let mut raw_values = self.raw_values.lock().map_err(|_| {
                    StoreError::Storage("lock poisoned".to_string())
                })?;
                raw_values.clear();
            }
        }
        Ok(())
    }

    async fn get_raw_value(
        &self,
        key: &str,
    ) -> Result<Option<String>, StoreError> {
        let raw_values = self
            .raw_values
            .lock()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        Ok(raw_values.get(key).cloned())
    }

    async fn set_raw_value(
        &self,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let mut raw_values = self
            .raw_values
            .lock()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        raw_values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn clear_raw_value(&self, key: &str) -> Result<(), StoreError> {
        let mut raw_values = self
            .raw_values
            .lock()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        raw_values.remove(key);
        Ok(())
    }
}
