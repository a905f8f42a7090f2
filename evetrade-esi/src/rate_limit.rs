//! Outbound request gating: a sliding one-second window, per-group token
//! buckets rebuilt from ESI response headers, and the global error-limit
//! lockout triggered by 420 abuse responses.
use reqwest::header::HeaderMap;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

pub const RATE_LIMIT_GROUP_HEADER: &str = "x-ratelimit-group";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_USED_HEADER: &str = "x-ratelimit-used";
pub const ERROR_LIMIT_REMAIN_HEADER: &str = "x-esi-error-limit-remain";
pub const ERROR_LIMIT_RESET_HEADER: &str = "x-esi-error-limit-reset";

const WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Hard budget of requests per sliding second.
    pub requests_per_second: usize,
    /// Soft backpressure kicks in below this many remaining group tokens.
    pub slowdown_threshold: u64,
    /// Fixed extra delay applied while a group is throttled.
    pub slowdown_delay: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            slowdown_threshold: 10,
            slowdown_delay: Duration::from_millis(200),
        }
    }
}

/// Last-known quota for one upstream rate-limit group, rebuilt from
/// response headers and never persisted.
#[derive(Debug, Clone, Default)]
pub struct RateLimitBucket {
    pub group: String,
    pub remaining: Option<u64>,
    pub limit: Option<String>,
    pub used: Option<u64>,
}

#[derive(Debug, Default)]
struct ErrorLimitState {
    remaining: Option<u64>,
    reset_seconds: Option<u64>,
    blocked_until: Option<Instant>,
}

#[derive(Debug, Default)]
struct Inner {
    window: VecDeque<Instant>,
    buckets: HashMap<String, RateLimitBucket>,
    error_limit: ErrorLimitState,
}

/// Gate for every outbound ESI call. Shared state lives behind one async
/// mutex; sleeps always happen with the lock released so concurrent callers
/// serialize briefly but never block each other's HTTP I/O.
pub struct RateLimiter {
    config: RateLimiterConfig,
    inner: Mutex<Inner>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Suspend until one more request may be issued, then record it.
    pub async fn wait(&self, group: Option<&str>) {
        // Global abuse lockout applies to every caller, whatever the group.
        loop {
            let pending = {
                let mut inner = self.inner.lock().await;
                match inner.error_limit.blocked_until {
                    Some(until) => {
                        let now = Instant::now();
                        if until > now {
                            Some(until - now)
                        } else {
                            inner.error_limit.blocked_until = None;
                            None
                        }
                    }
                    None => None,
                }
            };
            match pending {
                Some(remaining) => {
                    tracing::debug!(
                        "error limit lockout active, waiting {:?}",
                        remaining
                    );
                    sleep(remaining).await;
                }
                None => break,
            }
        }

        // Sliding one-second window.
        let throttled = loop {
            let mut inner = self.inner.lock().await;
            let now = Instant::now();
            while let Some(oldest) = inner.window.front().copied() {
                if now.duration_since(oldest) >= WINDOW {
                    inner.window.pop_front();
                } else {
                    break;
                }
            }
            if inner.window.len() >= self.config.requests_per_second {
                if let Some(oldest) = inner.window.front().copied() {
                    let wait_for = WINDOW - now.duration_since(oldest);
                    drop(inner);
                    sleep(wait_for).await;
                    continue;
                }
            }
            inner.window.push_back(now);
            break group
                .and_then(|g| inner.buckets.get(g))
                .and_then(|b| b.remaining)
                .map(|remaining| remaining < self.config.slowdown_threshold)
                .unwrap_or(false);
        };

        // Soft backpressure, one fixed delay rather than a hard wait.
        if throttled {
            tracing::debug!(
                ?group,
                "rate limit group low on tokens, slowing down"
            );
            sleep(self.config.slowdown_delay).await;
        }
    }

    /// Ingest rate-limit and error-limit headers from an upstream response.
    /// Non-numeric values are ignored, not fatal.
    pub async fn extract_limit_info(&self, headers: &HeaderMap) {
        let mut inner = self.inner.lock().await;
        if let Some(group) = header_str(headers, RATE_LIMIT_GROUP_HEADER) {
            let bucket = inner
                .buckets
                .entry(group.clone())
                .or_insert_with(|| RateLimitBucket {
                    group,
                    ..Default::default()
                });
            if let Some(value) = header_u64(headers, RATE_LIMIT_REMAINING_HEADER)
            {
                bucket.remaining = Some(value);
            }
            if let Some(value) = header_str(headers, RATE_LIMIT_LIMIT_HEADER) {
                bucket.limit = Some(value);
            }
            if let Some(value) = header_u64(headers, RATE_LIMIT_USED_HEADER) {
                bucket.used = Some(value);
            }
        }
        if let Some(value) = header_u64(headers, ERROR_LIMIT_REMAIN_HEADER) {
            inner.error_limit.remaining = Some(value);
        }
        if let Some(value) = header_u64(headers, ERROR_LIMIT_RESET_HEADER) {
            inner.error_limit.reset_seconds = Some(value);
        }
    }

    /// Handle a 429/420 response. Returns the wait that was already slept,
    /// or `None` when retries are exhausted or no `Retry-After` was sent.
    /// A 420 additionally arms the process-wide lockout.
    pub async fn handle_429_retry_after(
        &self,
        status: reqwest::StatusCode,
        headers: &HeaderMap,
        url: &str,
        attempt: usize,
        max_retries: usize,
    ) -> Option<Duration> {
        if status.as_u16() == 420 {
            tracing::error!(%url, ?headers, "error limited (420) by ESI");
            let mut inner = self.inner.lock().await;
            let reset = header_u64(headers, ERROR_LIMIT_RESET_HEADER)
                .or(inner.error_limit.reset_seconds);
            if let Some(reset) = reset {
                inner.error_limit.blocked_until =
                    Some(Instant::now() + Duration::from_secs(reset));
            }
        }

        let retry_after = parse_retry_after(headers)?;
        if attempt >= max_retries {
            return None;
        }
        tracing::warn!(
            %url,
            ?retry_after,
            attempt,
            "rate limited, honoring Retry-After"
        );
        sleep(retry_after).await;
        Some(retry_after)
    }

    /// Last-known bucket for a group, if any response reported one yet.
    pub async fn bucket(&self, group: &str) -> Option<RateLimitBucket> {
        self.inner.lock().await.buckets.get(group).cloned()
    }
}

/// Parse a Retry-After header (whole seconds). Missing or non-numeric
/// values yield `None`.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    header_u64(headers, reqwest::header::RETRY_AFTER.as_str())
        .map(Duration::from_secs)
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    header_str(headers, name).and_then(|value| value.trim().parse().ok())
}
