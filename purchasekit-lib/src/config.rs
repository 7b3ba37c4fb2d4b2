//! Configuration types for the coordinator and the subscription service.
//!
//! # Environment Variables
//!
//! [`ServiceConfig::from_env`] reads:
//! - `PURCHASEKIT_API_URL` - service base URL (optional, defaults to the public API)
//! - `PURCHASEKIT_API_KEY` - public SDK key (required)
//! - `PURCHASEKIT_PLATFORM` - platform header value (optional, defaults to `ios`)

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default subscription service endpoint.
pub const DEFAULT_API_URL: &str = "https://api.revenuecat.com";

/// Coordinator behaviour.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Fixed delay between background entitlement refresh attempts.
    #[serde(default = "default_refresh_retry_ms")]
    pub refresh_retry_ms: u64,
}

fn default_refresh_retry_ms() -> u64 {
    5_000
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            refresh_retry_ms: default_refresh_retry_ms(),
        }
    }
}

impl CoordinatorConfig {
    /// Set the background refresh retry delay.
    pub fn with_refresh_retry(mut self, interval: Duration) -> Self {
        self.refresh_retry_ms = saturating_millis(interval);
        self
    }

    /// Background refresh retry delay.
    pub fn refresh_retry_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_retry_ms)
    }
}

/// Whole milliseconds in `duration`, clamped to `u64::MAX`.
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Configuration for the subscription-service backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// REST API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Public SDK key sent as a bearer token.
    pub api_key: String,

    /// Value of the `X-Platform` header.
    #[serde(default = "default_platform")]
    pub platform: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_platform() -> String {
    "ios".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl ServiceConfig {
    /// Create a configuration for the default endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_url: default_api_url(),
            api_key: api_key.into(),
            platform: default_platform(),
            timeout_secs: default_timeout(),
        }
    }

    /// Load from `PURCHASEKIT_*` environment variables.
    ///
    /// Returns `None` when no API key is configured.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("PURCHASEKIT_API_KEY").ok()?;
        let mut config = Self::new(api_key);
        if let Ok(url) = std::env::var("PURCHASEKIT_API_URL") {
            config = config.with_api_url(url);
        }
        if let Ok(platform) = std::env::var("PURCHASEKIT_PLATFORM") {
            config = config.with_platform(platform);
        }
        Some(config)
    }

    /// Set the API base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the platform header.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}
