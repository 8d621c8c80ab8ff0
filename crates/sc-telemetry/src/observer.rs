//! [`Observer`] backed by `tracing` and the Prometheus counters.

use shared_types::Observer;
use tracing::{error, warn};

use crate::metric_inc;
use crate::metrics::{FRAMES_DROPPED, HANDLER_FAILURES, TERMINAL_FAILURES, TRANSPORT_ERRORS};

/// Longest slice of a dropped frame copied into a log line.
const RAW_PREVIEW_CHARS: usize = 256;

/// Logs every observation and counts it.
///
/// Raw dropped frames are only logged at `debug`, truncated.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl Observer for TracingObserver {
    fn frame_dropped(&self, reason: &str, raw: &str) {
        metric_inc!(FRAMES_DROPPED, &[reason_label(reason)]);
        warn!(reason, "Inbound frame dropped");
        tracing::debug!(reason, raw = %preview(raw), "Dropped frame contents");
    }

    fn handler_failed(&self, channel: &str, action: &str, subscription: u64, error: &str) {
        metric_inc!(HANDLER_FAILURES, &[channel, action]);
        warn!(channel, action, subscription, error, "Subscription handler failed");
    }

    fn transport_error(&self, error: &str) {
        metric_inc!(TRANSPORT_ERRORS);
        warn!(error, "Transport error");
    }

    fn terminal_failure(&self, attempts: u32, reason: &str) {
        metric_inc!(TERMINAL_FAILURES);
        error!(attempts, reason, "Connection gave up reconnecting");
    }
}

/// Parse errors carry details after a colon; the label keeps the stable prefix.
fn reason_label(reason: &str) -> &str {
    reason.split(':').next().unwrap_or(reason).trim()
}

fn preview(raw: &str) -> &str {
    match raw.char_indices().nth(RAW_PREVIEW_CHARS) {
        Some((end, _)) => &raw[..end],
        None => raw,
    }
}
