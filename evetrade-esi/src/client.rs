//! The rate-limited, retrying, ETag-aware GET client for ESI.
use crate::config::EsiConfig;
use crate::error::EsiError;
use crate::etag::EtagCache;
use crate::http::{build_http_client, HttpClientParams};
use crate::rate_limit::{RateLimiter, RATE_LIMIT_GROUP_HEADER};
use evetrade_store::{CacheStore, CachedPayload};
use reqwest::header::ETAG;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;

pub struct EsiClient {
    http: reqwest::Client,
    base_url: String,
    limiter: Arc<RateLimiter>,
    etags: EtagCache,
    store: Arc<dyn CacheStore>,
    /// Rate-limit group per URL, learned from response headers. A URL's
    /// group is unknown until its first response comes back.
    url_groups: Mutex<HashMap<String, String>>,
    max_retries: usize,
    retry_delay: Duration,
    pub default_ttl_hours: f64,
    pub market_ttl_hours: f64,
}

impl EsiClient {
    pub fn new(
        config: &EsiConfig,
        store: Arc<dyn CacheStore>,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, EsiError> {
        let http = build_http_client(HttpClientParams {
            timeout: config.timeout,
            connect_timeout: config.connect_timeout,
            user_agent: &config.user_agent,
        })
        .map_err(|err| EsiError::Transport {
            url: config.base_url.clone(),
            source: err,
        })?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limiter,
            etags: EtagCache::new(store.clone()),
            store,
            url_groups: Mutex::new(HashMap::new()),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            default_ttl_hours: config.default_ttl_hours,
            market_ttl_hours: config.market_ttl_hours,
        })
    }

    fn build_url(&self, endpoint: &str, params: &[(&str, String)]) -> String {
        let mut url = format!("{}{}", self.base_url, endpoint);
        if !params.is_empty() {
            let query: Vec<String> = params
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }

    /// GET an endpoint with the default retry budget.
    pub async fn get(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Value, EsiError> {
        self.get_with_retries(endpoint, params, self.max_retries).await
    }

    /// GET an endpoint: rate-limiter wait, conditional headers, then a
    /// classified retry loop over transport failures, 5xx and 429/420.
    pub async fn get_with_retries(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        max_retries: usize,
    ) -> Result<Value, EsiError> {
        let url = self.build_url(endpoint, params);
        let mut attempt: usize = 0;
        loop {
            let group = self.url_groups.lock().await.get(&url).cloned();
            self.limiter.wait(group.as_deref()).await;
            let headers = self.etags.request_headers(&url).await?;

            let response =
                match self.http.get(&url).headers(headers).send().await {
                    Ok(response) => response,
                    Err(err) => {
                        if attempt < max_retries {
                            tracing::warn!(
                                %url,
                                attempt,
                                "transport failure, retrying: {}",
                                err
                            );
                            sleep(self.retry_delay).await;
                            attempt += 1;
                            continue;
                        }
                        return Err(EsiError::Transport { url, source: err });
                    }
                };

            self.limiter.extract_limit_info(response.headers()).await;
            if let Some(group) = response
                .headers()
                .get(RATE_LIMIT_GROUP_HEADER)
                .and_then(|value| value.to_str().ok())
            {
                self.url_groups
                    .lock()
                    .await
                    .insert(url.clone(), group.to_string());
            }

            let status = response.status();
            if status == StatusCode::NOT_MODIFIED {
                return self.etags.get_cached_response_for_304(&url).await;
            }
            if status.is_success() {
                let etag = response
                    .headers()
                    .get(ETAG)
                    .and_then(|value| value.to_str().ok())
                    .map(|value| value.to_string());
                let body: Value = response.json().await.map_err(|err| {
                    EsiError::Transport {
                        url: url.clone(),
                        source: err,
                    }
                })?;
                self.etags
                    .cache_response(&url, etag.as_deref(), &body)
                    .await?;
                return Ok(body);
            }
            match status.as_u16() {
                400 => return Err(EsiError::BadRequest { url }),
                404 => return Err(EsiError::NotFound { url }),
                420 | 429 => {
                    let waited = self
                        .limiter
                        .handle_429_retry_after(
                            status,
                            response.headers(),
                            &url,
                            attempt,
                            max_retries,
                        )
                        .await;
                    if waited.is_some() {
                        attempt += 1;
                        continue;
                    }
                    return Err(EsiError::RateLimited { url });
                }
                code if code >= 500 => {
                    if attempt < max_retries {
                        tracing::warn!(
                            %url,
                            status = code,
                            attempt,
                            "server error, retrying"
                        );
                        sleep(self.retry_delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(EsiError::Server { url, status: code });
                }
                code => return Err(EsiError::Client { url, status: code }),
            }
        }
    }

    /// Deterministic cache key for an operation and its arguments.
    pub fn cache_key(operation: &str, args: &[String]) -> String {
        let signature = format!("{}:{}", operation, args.join(":"));
        format!("{}:{:x}", operation, md5::compute(signature))
    }

    /// Cache-aside wrapper for read-only idempotent operations. A fresh
    /// store entry short-circuits the entire network path; on a miss the
    /// fetch closure runs and its result is stored under the signature key.
    pub async fn cached<F, Fut>(
        &self,
        operation: &str,
        args: &[String],
        ttl_hours: f64,
        fetch: F,
    ) -> Result<Value, EsiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, EsiError>>,
    {
        let key = Self::cache_key(operation, args);
        if let Some(payload) = self.store.get(&key).await? {
            tracing::debug!(operation, %key, "result cache hit");
            return Ok(payload.into_json());
        }
        let body = fetch().await?;
        self.store
            .set(&key, CachedPayload::from_json(body.clone()), ttl_hours)
            .await?;
        Ok(body)
    }
}
