//! # Event Handlers
//!
//! The callback side of the registry. Handlers are synchronous: they run on
//! the connection driver task, one frame at a time, so anything slow should
//! hand the payload off to its own task or channel.

use std::sync::Arc;

use serde_json::Value;

/// Error returned by a handler. Reported to the observer, never propagated.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Receiver of `data` payloads for one (channel, action).
pub trait EventHandler: Send + Sync {
    /// Handle one payload.
    fn handle(&self, payload: &Value) -> Result<(), HandlerError>;
}

impl<F> EventHandler for F
where
    F: Fn(&Value) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, payload: &Value) -> Result<(), HandlerError> {
        self(payload)
    }
}

/// Wrap a closure as a shareable handler.
///
/// ```
/// use shared_bus::handler_fn;
///
/// let handler = handler_fn(|payload| {
///     println!("{payload}");
///     Ok(())
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F>(f: F) -> Arc<dyn EventHandler>
where
    F: Fn(&Value) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(f)
}
