//! Typed application configuration, loaded from a YAML file supplied by the
//! process entry point. Every component receives its settings and its store
//! handle at construction time; nothing here is global.
use crate::rate_limit::RateLimiterConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub esi: EsiConfig,
    #[serde(default)]
    pub locations: LocationsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub uri: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EsiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// App name, version and maintainer contact per ESI etiquette.
    pub user_agent: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: usize,
    #[serde(default = "default_slowdown_threshold")]
    pub slowdown_threshold: u64,
    #[serde(default = "default_slowdown_delay_ms")]
    pub slowdown_delay_ms: u64,
    #[serde(default = "default_ttl_hours")]
    pub default_ttl_hours: f64,
    #[serde(default = "default_market_ttl_hours")]
    pub market_ttl_hours: f64,
    #[serde(default = "default_deal_concurrency")]
    pub deal_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationsConfig {
    #[serde(default = "default_id_ranges_file")]
    pub id_ranges_file: String,
}

impl Default for LocationsConfig {
    fn default() -> Self {
        Self {
            id_ranges_file: default_id_ranges_file(),
        }
    }
}

impl AppConfig {
    pub fn from_yaml_file(
        path: impl AsRef<Path>,
    ) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

impl EsiConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn rate_limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            requests_per_second: self.requests_per_second,
            slowdown_threshold: self.slowdown_threshold,
            slowdown_delay: Duration::from_millis(self.slowdown_delay_ms),
        }
    }
}

fn default_prefix() -> String {
    "evetrade".to_string()
}

fn default_base_url() -> String {
    "https://esi.evetech.net/latest".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_retries() -> usize {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_requests_per_second() -> usize {
    10
}

fn default_slowdown_threshold() -> u64 {
    10
}

fn default_slowdown_delay_ms() -> u64 {
    200
}

fn default_ttl_hours() -> f64 {
    24.0
}

fn default_market_ttl_hours() -> f64 {
    1.0
}

fn default_deal_concurrency() -> usize {
    10
}

fn default_id_ranges_file() -> String {
    "data/id_ranges.json".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML_CONF_TEXT: &str = r#"
    store:
      uri: redis://127.0.0.1:6379
      prefix: evetrade-dev
    esi:
      user_agent: "evetrade/0.1.0 (maintainer@example.com)"
      timeout: 15
      requests_per_second: 5
    "#;

    #[test]
    fn test_parse_config_with_defaults() {
        let config: AppConfig = serde_yaml::from_str(YAML_CONF_TEXT).unwrap();
        assert_eq!(config.store.prefix, "evetrade-dev");
        assert_eq!(config.esi.timeout, 15);
        assert_eq!(config.esi.requests_per_second, 5);
        // Unset fields fall back to defaults.
        assert_eq!(config.esi.max_retries, 3);
        assert_eq!(config.esi.market_ttl_hours, 1.0);
        assert_eq!(config.locations.id_ranges_file, "data/id_ranges.json");
    }

    #[test]
    fn test_missing_user_agent_is_an_error() {
        let result: Result<AppConfig, _> = serde_yaml::from_str(
            "store:\n  uri: redis://127.0.0.1:6379\nesi: {}\n",
        );
        assert!(result.is_err());
    }
}
