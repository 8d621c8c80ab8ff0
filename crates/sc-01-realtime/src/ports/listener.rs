//! Callbacks from the connection driver.

/// Receives connection events on the driver task.
///
/// Calls are sequential and must not block: every inbound frame waits for
/// the previous call to return.
pub trait ConnectionListener: Send + Sync {
    /// The transport opened (first connect or reconnect).
    fn on_connected(&self);

    /// One inbound text frame, in arrival order.
    fn on_frame(&self, frame: &str);

    /// The client disconnected on purpose; forget all subscription state.
    fn on_teardown(&self);

    /// Retries are exhausted or a precondition failed.
    fn on_terminal_failure(&self, attempts: u32, reason: &str) {
        let _ = (attempts, reason);
    }
}
