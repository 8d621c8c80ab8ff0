//! Telemetry configuration from environment variables.

use std::env;

use serde::{Deserialize, Serialize};

pub const ENV_SERVICE_NAME: &str = "SC_SERVICE_NAME";
pub const ENV_LOG_LEVEL: &str = "SC_LOG_LEVEL";
pub const ENV_RUST_LOG: &str = "RUST_LOG";
pub const ENV_JSON_LOGS: &str = "SC_JSON_LOGS";

/// Configuration for logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log filter directive (`info`, `sc_01_realtime=debug,warn`, ...)
    pub log_level: String,

    /// Emit JSON lines instead of the human-readable format
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "sealed-chat".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SC_SERVICE_NAME`: Service name (default: sealed-chat)
    /// - `SC_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `SC_JSON_LOGS`: Enable JSON logs (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            service_name: lookup(ENV_SERVICE_NAME).unwrap_or(defaults.service_name),

            log_level: lookup(ENV_LOG_LEVEL)
                .or_else(|| lookup(ENV_RUST_LOG))
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.log_level),

            json_logs: lookup(ENV_JSON_LOGS)
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(defaults.json_logs),
        }
    }

    /// Same configuration under a different service name.
    pub fn for_service(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }
}
