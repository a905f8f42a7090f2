//! Redis implementation of the `CacheStore` trait, the production backing.
//! Structured entries and raw values live under separate key prefixes so a
//! namespace-wide clear can walk them with SCAN.
use crate::{CacheEntry, CacheStore, CachedPayload, StoreError};
use async_trait::async_trait;
use rustis::commands::{GenericCommands, ScanOptions, StringCommands};

pub struct RedisCacheStore {
    pub client: rustis::client::Client,
    pub prefix: String,
}

impl RedisCacheStore {
    pub fn new(client: rustis::client::Client, prefix: &str) -> Self {
        Self {
            client,
            prefix: prefix.to_string(),
        }
    }

    /// Connect to redis and wrap the client.
    pub async fn connect(uri: &str, prefix: &str) -> Result<Self, StoreError> {
        let client = rustis::client::Client::connect(uri).await?;
        tracing::debug!(prefix, "connected redis cache store");
        Ok(Self::new(client, prefix))
    }

    fn entry_key(&self, key: &str) -> String {
        format!("{}:entry:{}", self.prefix, key)
    }

    fn raw_key(&self, key: &str) -> String {
        format!("{}:raw:{}", self.prefix, key)
    }

    async fn load_entry(
        &self,
        key: &str,
    ) -> Result<Option<CacheEntry>, StoreError> {
        let value: Option<String> = self.client.get(self.entry_key(key)).await?;
        match value {
            Some(value) => {
                let entry = serde_json::from_str(&value).map_err(|err| {
                    StoreError::Deserialization(err.to_string())
                })?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheStore")
            .field("prefix", &self.prefix)
            .finish()
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn is_valid(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .load_entry(key)
            .await?
            .map(|e| e.is_valid())
            .unwrap_or(false))
    }

    async fn get(&self, key: &str) -> Result<Option<CachedPayload>, StoreError> {
        // Stale entries are left in place; readers simply never see them.
        match self.load_entry(key).await? {
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
        self.client.set(self.entry_key(key), value).await?;
        Ok(())
    }

    async fn clear(&self, key: Option<&str>) -> Result<(), StoreError> {
        match key {
            Some(key) => {
                self.client.del(self.entry_key(key)).await?;
            }
            None => {
                let pattern = format!("{}:*", self.prefix);
                let mut cursor: u64 = 0;
                loop {
                    let (next, keys): (u64, Vec<String>) = self
                        .client
                        .scan(
                            cursor,
                            ScanOptions::default()
                                .match_pattern(pattern.clone())
                                .count(100),
                        )
                        .await?;
                    if !keys.is_empty() {
                        tracing::debug!(count = keys.len(), "clearing store keys");
                        self.client.del(keys).await?;
                    }
                    if next == 0 {
                        break;
                    }
                    cursor = next;
                }
            }
        }
        Ok(())
    }

    async fn get_raw_value(
        &self,
        key: &str,
    ) -> Result<Option<String>, StoreError> {
        let value: Option<String> = self.client.get(self.raw_key(key)).await?;
        Ok(value)
    }

    async fn set_raw_value(
        &self,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        self.client.set(self.raw_key(key), value).await?;
        Ok(())
    }

    async fn clear_raw_value(&self, key: &str) -> Result<(), StoreError> {
        self.client.del(self.raw_key(key)).await?;
        Ok(())
    }
}
