//! Access layer for EVE Online's public ESI REST API.
//!
//! The pieces compose bottom-up: a rate limiter gates every outbound call,
//! an ETag cache turns repeat fetches into cheap 304s, and the client wraps
//! both in a retry loop with a typed error taxonomy. On top sits a thin
//! repository facade (the contract consumed by domain services), a location
//! validator that keeps invalid-ID storms away from the upstream API, and a
//! deal scanner doing bounded concurrent market sweeps.
pub mod client;
pub mod config;
pub mod error;
pub mod etag;
pub mod http;
pub mod locations;
pub mod market;
pub mod rate_limit;
pub mod repository;
pub mod test_utils;

pub use client::EsiClient;
pub use config::{AppConfig, ConfigError};
pub use error::EsiError;
pub use etag::EtagCache;
pub use locations::{IdRangeTable, LocationType, LocationValidator};
pub use market::{Deal, DealFinder};
pub use rate_limit::{RateLimitBucket, RateLimiter, RateLimiterConfig};
pub use repository::{EsiApiRepository, EsiRepository};
