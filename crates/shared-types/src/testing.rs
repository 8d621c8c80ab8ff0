//! Test doubles shared by the crate test suites.

use parking_lot::Mutex;

use crate::observer::Observer;

/// One observation captured by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed {
    FrameDropped { reason: String, raw: String },
    HandlerFailed { channel: String, action: String, subscription: u64, error: String },
    TransportError(String),
    TerminalFailure { attempts: u32, reason: String },
}

/// Observer that records every call in order.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Observed>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn events(&self) -> Vec<Observed> {
        self.events.lock().clone()
    }

    pub fn handler_failures(&self) -> usize {
        self.count(|e| matches!(e, Observed::HandlerFailed { .. }))
    }

    pub fn dropped_frames(&self) -> usize {
        self.count(|e| matches!(e, Observed::FrameDropped { .. }))
    }

    pub fn terminal_failures(&self) -> usize {
        self.count(|e| matches!(e, Observed::TerminalFailure { .. }))
    }

    fn count(&self, pred: impl Fn(&Observed) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }

    fn push(&self, event: Observed) {
        self.events.lock().push(event);
    }
}

impl Observer for RecordingObserver {
    fn frame_dropped(&self, reason: &str, raw: &str) {
        self.push(Observed::FrameDropped {
            reason: reason.to_string(),
            raw: raw.to_string(),
        });
    }

    fn handler_failed(&self, channel: &str, action: &str, subscription: u64, error: &str) {
        self.push(Observed::HandlerFailed {
            channel: channel.to_string(),
            action: action.to_string(),
            subscription,
            error: error.to_string(),
        });
    }

    fn transport_error(&self, error: &str) {
        self.push(Observed::TransportError(error.to_string()));
    }

    fn terminal_failure(&self, attempts: u32, reason: &str) {
        self.push(Observed::TerminalFailure {
            attempts,
            reason: reason.to_string(),
        });
    }
}
