//! Conditional-request bookkeeping layered on the store's raw values.
//!
//! Each URL owns a pair of raw entries: its last-seen ETag and the full
//! response body that ETag covered. The pair is only trustworthy while the
//! ETag is unchanged, so the two are written and cleared together; a changed
//! or missing ETag always drops the stale body first.
use crate::error::EsiError;
use evetrade_store::CacheStore;
use reqwest::header::{HeaderMap, HeaderValue, IF_NONE_MATCH};
use serde_json::Value;
use std::sync::Arc;

pub struct EtagCache {
    store: Arc<dyn CacheStore>,
}

impl EtagCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    fn etag_key(url: &str) -> String {
        format!("etag:{}", url)
    }

    fn body_key(url: &str) -> String {
        format!("etag-body:{}", url)
    }

    pub async fn get_etag(&self, url: &str) -> Result<Option<String>, EsiError> {
        Ok(self.store.get_raw_value(&Self::etag_key(url)).await?)
    }

    pub async fn set_etag(&self, url: &str, etag: &str) -> Result<(), EsiError> {
        self.store.set_raw_value(&Self::etag_key(url), etag).await?;
        Ok(())
    }

    pub async fn get_cached_response(
        &self,
        url: &str,
    ) -> Result<Option<Value>, EsiError> {
        match self.store.get_raw_value(&Self::body_key(url)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set_cached_response(
        &self,
        url: &str,
        body: &Value,
    ) -> Result<(), EsiError> {
        let raw = serde_json::to_string(body)?;
        self.store.set_raw_value(&Self::body_key(url), &raw).await?;
        Ok(())
    }

    /// Conditional headers for a request: `If-None-Match` when an ETag is
    /// known, empty otherwise.
    pub async fn request_headers(&self, url: &str) -> Result<HeaderMap, EsiError> {
        let mut headers = HeaderMap::new();
        if let Some(etag) = self.get_etag(url).await? {
            match HeaderValue::from_str(&etag) {
                Ok(value) => {
                    headers.insert(IF_NONE_MATCH, value);
                }
                Err(_) => {
                    tracing::warn!(%url, "stored etag is not a valid header value, dropping it");
                    self.store.clear_raw_value(&Self::etag_key(url)).await?;
                }
            }
        }
        Ok(headers)
    }

    /// Reconcile stored state with a response's ETag header.
    ///
    /// A new ETag invalidates the prior body before being stored; no ETag at
    /// all means the resource stopped supporting conditional caching, so both
    /// halves of the pair are dropped; an unchanged ETag leaves the body as is.
    pub async fn update_from_response(
        &self,
        url: &str,
        etag: Option<&str>,
    ) -> Result<(), EsiError> {
        let stored = self.get_etag(url).await?;
        match etag {
            Some(etag) => {
                if stored.as_deref() != Some(etag) {
                    self.store.clear_raw_value(&Self::body_key(url)).await?;
                    self.set_etag(url, etag).await?;
                }
            }
            None => {
                self.store.clear_raw_value(&Self::etag_key(url)).await?;
                self.store.clear_raw_value(&Self::body_key(url)).await?;
            }
        }
        Ok(())
    }

    /// Standard post-success hook: reconcile the ETag, then store the body.
    pub async fn cache_response(
        &self,
        url: &str,
        etag: Option<&str>,
        body: &Value,
    ) -> Result<(), EsiError> {
        self.update_from_response(url, etag).await?;
        if etag.is_some() {
            self.set_cached_response(url, body).await?;
        }
        Ok(())
    }

    /// Resolve a 304 to the previously cached body.
    ///
    /// A 304 with no stored body means the pair went inconsistent; serving
    /// nothing silently would be wrong, so the stale ETag is cleared (the
    /// next attempt refetches in full) and the call fails.
    pub async fn get_cached_response_for_304(
        &self,
        url: &str,
    ) -> Result<Value, EsiError> {
        match self.get_cached_response(url).await? {
            Some(body) => Ok(body),
            None => {
                tracing::warn!(
                    %url,
                    "got 304 but no cached body exists, clearing stale etag"
                );
                self.store.clear_raw_value(&Self::etag_key(url)).await?;
                Err(EsiError::EtagInconsistency {
                    url: url.to_string(),
                })
            }
        }
    }
}
