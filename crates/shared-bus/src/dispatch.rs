//! # Fan-out
//!
//! Delivery of one payload to a snapshot of handlers. Each handler is
//! isolated: an `Err` or a panic is reported to the observer and the next
//! handler still runs.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use shared_types::Observer;
use tracing::warn;

use crate::handler::EventHandler;
use crate::registry::SubscriptionId;

/// Outcome of one dispatch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that returned `Ok`.
    pub delivered: usize,
    /// Handlers that returned `Err` or panicked.
    pub failed: usize,
}

impl DispatchReport {
    /// Total handlers invoked.
    pub fn matched(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Handlers captured for one (channel, action) at one instant.
pub struct DispatchBatch {
    channel: String,
    action: String,
    targets: Vec<(SubscriptionId, Arc<dyn EventHandler>)>,
}

impl DispatchBatch {
    pub(crate) fn new(
        channel: &str,
        action: &str,
        targets: Vec<(SubscriptionId, Arc<dyn EventHandler>)>,
    ) -> Self {
        Self {
            channel: channel.to_string(),
            action: action.to_string(),
            targets,
        }
    }

    /// Number of handlers in the batch.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the batch has no handlers.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Invoke every handler in order.
    pub fn deliver(self, payload: &Value, observer: &dyn Observer) -> DispatchReport {
        let mut report = DispatchReport::default();

        for (id, handler) in &self.targets {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler.handle(payload)));
            let error = match outcome {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(panic) => format!("handler panicked: {}", panic_message(panic.as_ref())),
            };

            report.failed += 1;
            warn!(
                channel = %self.channel,
                action = %self.action,
                subscription = %id,
                error = %error,
                "Handler failed"
            );
            observer.handler_failed(&self.channel, &self.action, id.as_u64(), &error);
        }

        report
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
