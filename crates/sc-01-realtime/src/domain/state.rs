//! Connection state and lifecycle notifications.

use std::fmt;
use std::time::Duration;

/// Where the single physical connection currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Waiting out a backoff delay before the next open attempt.
    ReconnectPending,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::ReconnectPending => "reconnect-pending",
        };
        f.write_str(name)
    }
}

/// Broadcast to lifecycle subscribers on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// An open attempt started. `attempt` is 0 for the first connect.
    Connecting { attempt: u32 },
    Connected,
    /// The connection closed and another attempt will follow after `delay`.
    ReconnectScheduled { attempt: u32, delay: Duration },
    /// The client disconnected on purpose.
    Disconnected,
    /// Retries are exhausted or a precondition failed; nothing further will
    /// happen until `connect()` is called again.
    TerminalFailure { attempts: u32, reason: String },
}
