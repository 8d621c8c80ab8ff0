//! Realtime connection configuration with validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Endpoint URL.
pub const ENV_URL: &str = "SC_WS_URL";
/// Reconnect ceiling.
pub const ENV_MAX_RECONNECT_ATTEMPTS: &str = "SC_WS_MAX_RECONNECT_ATTEMPTS";
/// Backoff base in milliseconds.
pub const ENV_BASE_DELAY_MS: &str = "SC_WS_BASE_DELAY_MS";
/// Per-attempt open timeout in milliseconds.
pub const ENV_CONNECT_TIMEOUT_MS: &str = "SC_WS_CONNECT_TIMEOUT_MS";

/// Realtime connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Single endpoint URL (`ws://` or `wss://`)
    pub url: String,
    /// Reconnects attempted before giving up (default: 5)
    pub max_reconnect_attempts: u32,
    /// Delay before reconnect *n* is `base_delay_ms * 2^n` (default: 1000)
    pub base_delay_ms: u64,
    /// Bound on each open attempt (default: 10000)
    pub connect_timeout_ms: u64,
    /// Buffer of the lifecycle broadcast channel (default: 64)
    pub lifecycle_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:3000/cable".to_string(),
            max_reconnect_attempts: 5,
            base_delay_ms: 1000,
            connect_timeout_ms: 10_000,
            lifecycle_capacity: 64,
        }
    }
}

impl RealtimeConfig {
    /// Start a builder from the defaults.
    pub fn builder() -> RealtimeConfigBuilder {
        RealtimeConfigBuilder::default()
    }

    /// Read settings from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_URL) {
            config.url = url;
        }
        if let Some(raw) = lookup(ENV_MAX_RECONNECT_ATTEMPTS) {
            config.max_reconnect_attempts = parse(ENV_MAX_RECONNECT_ATTEMPTS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_BASE_DELAY_MS) {
            config.base_delay_ms = parse(ENV_BASE_DELAY_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CONNECT_TIMEOUT_MS) {
            config.connect_timeout_ms = parse(ENV_CONNECT_TIMEOUT_MS, &raw)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(ConfigError::InvalidValue {
                name: "url",
                reason: format!("expected ws:// or wss:// URL, got `{}`", self.url),
            });
        }
        if self.base_delay_ms == 0 {
            return Err(ConfigError::InvalidValue {
                name: "base_delay_ms",
                reason: "cannot be 0".into(),
            });
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                name: "connect_timeout_ms",
                reason: "cannot be 0".into(),
            });
        }
        if self.lifecycle_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                name: "lifecycle_capacity",
                reason: "cannot be 0".into(),
            });
        }
        Ok(())
    }

    /// Backoff base as a duration.
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Open timeout as a duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        name,
        reason: format!("`{raw}`: {e}"),
    })
}

/// Fluent builder for [`RealtimeConfig`].
#[derive(Debug, Clone, Default)]
pub struct RealtimeConfigBuilder {
    config: RealtimeConfig,
}

impl RealtimeConfigBuilder {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.config.max_reconnect_attempts = attempts;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.base_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn lifecycle_capacity(mut self, capacity: usize) -> Self {
        self.config.lifecycle_capacity = capacity;
        self
    }

    /// Validate and produce the configuration.
    pub fn build(self) -> Result<RealtimeConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
