//! Geocoding client configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Configuration for the Nominatim geocoding client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Base URL for the Nominatim API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent identifying the application (required by the Nominatim usage policy)
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Minimum spacing between outbound requests in milliseconds
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    /// Result cache TTL in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of cached lookups
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Country filter used when the caller gives none (e.g., "cl" for Chile)
    #[serde(default = "default_country_code")]
    pub default_country_code: String,

    /// Result limit used when the caller gives none
    #[serde(default = "default_limit")]
    pub default_limit: u8,

    /// Preferred response language, forwarded as `accept-language`
    #[serde(default = "default_accept_language")]
    pub accept_language: Option<String>,

    /// Retry behaviour for throttled and failed requests
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_user_agent() -> String {
    concat!("InfraCheck/", env!("CARGO_PKG_VERSION"), " (citizen infrastructure reports)")
        .to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_rate_limit_ms() -> u64 {
    1000
}

const fn default_cache_ttl_secs() -> u64 {
    3600
}

const fn default_cache_capacity() -> usize {
    100
}

fn default_country_code() -> String {
    "cl".to_string()
}

const fn default_limit() -> u8 {
    5
}

#[allow(clippy::unnecessary_wraps)] // serde default must match the field type
fn default_accept_language() -> Option<String> {
    Some("es-CL".to_string())
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            rate_limit_ms: default_rate_limit_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            default_country_code: default_country_code(),
            default_limit: default_limit(),
            accept_language: default_accept_language(),
            retry: RetryPolicy::default(),
        }
    }
}

impl GeocodingConfig {
    /// Create a configuration suitable for testing against a mock upstream
    ///
    /// Keeps the upstream contract but shrinks every delay so retry paths
    /// complete quickly.
    #[must_use]
    pub fn for_testing(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: 5,
            rate_limit_ms: 10,
            accept_language: None,
            retry: RetryPolicy {
                max_attempts: 3,
                rate_limited_backoff_ms: 20,
                network_backoff_ms: 10,
            },
            ..Default::default()
        }
    }

    /// Minimum spacing between outbound requests
    #[must_use]
    pub const fn rate_limit_interval(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    /// Result cache TTL
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("base_url must not be empty".to_string());
        }

        if self.user_agent.trim().is_empty() {
            return Err("user_agent must not be empty".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }

        if self.rate_limit_ms == 0 {
            return Err("rate_limit_ms must be greater than 0".to_string());
        }

        if self.cache_capacity == 0 {
            return Err("cache_capacity must be greater than 0".to_string());
        }

        if self.default_limit == 0 {
            return Err("default_limit must be greater than 0".to_string());
        }

        if self.retry.max_attempts == 0 {
            return Err("retry.max_attempts must be greater than 0".to_string());
        }

        Ok(())
    }
}
