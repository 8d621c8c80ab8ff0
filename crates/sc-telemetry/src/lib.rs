//! # Sealed-Chat Telemetry
//!
//! Logging and metrics for the client core.
//!
//! ## Components
//!
//! - **Logging:** `tracing-subscriber` fmt layer with an `EnvFilter`,
//!   human-readable or JSON lines on stderr
//! - **Metrics:** Prometheus counters for everything the realtime layer
//!   drops or fails on, rendered with [`gather_metrics`]
//! - **Observer:** [`TracingObserver`] plugs both into the
//!   `shared_types::Observer` port
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sc_telemetry::{init_telemetry, TelemetryConfig, TracingObserver};
//!
//! fn main() -> Result<(), sc_telemetry::TelemetryError> {
//!     init_telemetry(&TelemetryConfig::from_env())?;
//!     let observer = TracingObserver::new();
//!     // hand `observer` to the realtime client
//!     # let _ = observer;
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SC_SERVICE_NAME` | `sealed-chat` | Service name in logs |
//! | `SC_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `SC_JSON_LOGS` | `false` | JSON log lines |

mod config;
mod logging;
pub mod metrics;
mod observer;

pub use config::{TelemetryConfig, ENV_JSON_LOGS, ENV_LOG_LEVEL, ENV_RUST_LOG, ENV_SERVICE_NAME};
pub use logging::{build_filter, init_logging};
pub use metrics::{
    gather_metrics, register_metrics, FRAMES_DROPPED, HANDLER_FAILURES, TERMINAL_FAILURES,
    TRANSPORT_ERRORS,
};
pub use observer::TracingObserver;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the global log subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)?;
    tracing::info!(service = %config.service_name, "Telemetry initialized");
    Ok(())
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
