//! Messaging API configuration with validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// API base URL.
pub const ENV_API_URL: &str = "SC_API_URL";
/// Per-request timeout in milliseconds.
pub const ENV_REQUEST_TIMEOUT_MS: &str = "SC_API_TIMEOUT_MS";
/// Send with one-time sender keys.
pub const ENV_SEAL_MESSAGES: &str = "SC_SEAL_MESSAGES";

/// Messaging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Base URL of the REST API, without the `/api/v1` prefix
    pub api_base_url: String,
    /// Bound on each HTTP request (default: 10000)
    pub request_timeout_ms: u64,
    /// Encrypt outgoing messages under a one-time sender key (default: false).
    ///
    /// Sealed messages cannot be re-read by their sender after a fetch.
    pub seal_outgoing: bool,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            request_timeout_ms: 10_000,
            seal_outgoing: false,
        }
    }
}

impl MessagingConfig {
    pub fn builder() -> MessagingConfigBuilder {
        MessagingConfigBuilder::default()
    }

    /// Read settings from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_API_URL) {
            config.api_base_url = url;
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_MS) {
            config.request_timeout_ms =
                raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                    name: "request_timeout_ms",
                    reason: format!("`{raw}`: {e}"),
                })?;
        }
        if let Some(raw) = lookup(ENV_SEAL_MESSAGES) {
            config.seal_outgoing = raw.eq_ignore_ascii_case("true") || raw == "1";
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidValue {
                name: "api_base_url",
                reason: format!("expected http:// or https:// URL, got `{}`", self.api_base_url),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                name: "request_timeout_ms",
                reason: "cannot be 0".into(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Absolute URL of an API path such as `/api/v1/messages`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }
}

/// Fluent builder for [`MessagingConfig`].
#[derive(Debug, Clone, Default)]
pub struct MessagingConfigBuilder {
    config: MessagingConfig,
}

impl MessagingConfigBuilder {
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn seal_outgoing(mut self, seal: bool) -> Self {
        self.config.seal_outgoing = seal;
        self
    }

    /// Validate and produce the configuration.
    pub fn build(self) -> Result<MessagingConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
