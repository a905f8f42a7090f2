use evetrade_store::StoreError;
use thiserror::Error;

/// Error taxonomy surfaced by the ESI client and repository facade.
///
/// 400/404 are non-retryable and propagate immediately; server and transport
/// failures are retried with a fixed delay before becoming fatal; 429/420
/// are retried with the upstream-mandated backoff.
#[derive(Error, Debug)]
pub enum EsiError {
    #[error("Bad request (400) for {url}")]
    BadRequest { url: String },

    #[error("Not found (404) for {url}")]
    NotFound { url: String },

    #[error("Client error {status} for {url}")]
    Client { url: String, status: u16 },

    #[error("Server error {status} for {url}")]
    Server { url: String, status: u16 },

    #[error("Transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Rate limited for {url}, retries exhausted")]
    RateLimited { url: String },

    #[error("Got 304 for {url} but no cached response body exists")]
    EtagInconsistency { url: String },

    #[error("Store error")]
    Store(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EsiError {
    /// True for 400/404, the errors the location validator feeds into its
    /// negative cache.
    pub fn is_invalid_target(&self) -> bool {
        matches!(
            self,
            EsiError::BadRequest { .. } | EsiError::NotFound { .. }
        )
    }
}
