//! Prometheus metrics for the client core.
//!
//! All metrics follow the naming convention: `sc_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // REALTIME METRICS (Subsystem 1)
    // =========================================================================

    /// Inbound frames dropped without dispatch
    pub static ref FRAMES_DROPPED: CounterVec = CounterVec::new(
        Opts::new("sc_realtime_frames_dropped_total", "Inbound frames dropped without dispatch"),
        &["reason"]
    ).expect("metric creation failed");

    /// Handler invocations that returned an error or panicked
    pub static ref HANDLER_FAILURES: CounterVec = CounterVec::new(
        Opts::new("sc_realtime_handler_failures_total", "Subscription handler failures"),
        &["channel", "action"]
    ).expect("metric creation failed");

    /// Non-fatal transport errors
    pub static ref TRANSPORT_ERRORS: Counter = Counter::new(
        "sc_realtime_transport_errors_total",
        "Non-fatal transport errors"
    ).expect("metric creation failed");

    /// Connections that exhausted their reconnect budget
    pub static ref TERMINAL_FAILURES: Counter = Counter::new(
        "sc_realtime_terminal_failures_total",
        "Connections that gave up reconnecting"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Registering twice is not an error.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(FRAMES_DROPPED.clone()),
        Box::new(HANDLER_FAILURES.clone()),
        Box::new(TRANSPORT_ERRORS.clone()),
        Box::new(TERMINAL_FAILURES.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all registered metrics in the Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
