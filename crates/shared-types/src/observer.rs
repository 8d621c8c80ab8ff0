//! # Observability Port
//!
//! Sink for everything the client core drops or cannot recover from on its
//! own. None of these calls may fail or block; implementations log, count,
//! or forward.

/// Observer of dropped frames, handler failures and connection failures.
///
/// All methods default to no-ops so implementations only override what they
/// care about.
pub trait Observer: Send + Sync {
    /// An inbound frame was dropped without dispatch.
    fn frame_dropped(&self, reason: &str, raw: &str) {
        let _ = (reason, raw);
    }

    /// A subscription handler returned an error or panicked.
    fn handler_failed(&self, channel: &str, action: &str, subscription: u64, error: &str) {
        let _ = (channel, action, subscription, error);
    }

    /// A non-fatal transport error occurred.
    fn transport_error(&self, error: &str) {
        let _ = error;
    }

    /// The connection gave up reconnecting.
    fn terminal_failure(&self, attempts: u32, reason: &str) {
        let _ = (attempts, reason);
    }
}

/// Observer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpObserver;

impl Observer for NoOpObserver {}
