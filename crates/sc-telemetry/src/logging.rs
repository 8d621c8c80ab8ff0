//! Structured logging.
//!
//! One global `tracing-subscriber` fmt subscriber, filtered by an
//! [`EnvFilter`] built from [`TelemetryConfig::log_level`]. With
//! `json_logs` every event is a single JSON object carrying the timestamp,
//! level, target, span fields and event fields.

use tracing_subscriber::EnvFilter;

use crate::{TelemetryConfig, TelemetryError};

/// Parse the configured filter directive.
pub fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("log level {:?}: {e}", config.log_level)))
}

/// Install the global subscriber.
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if config.json_logs {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.compact().try_init()
    };
    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::debug!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Structured logging configured"
    );
    Ok(())
}
