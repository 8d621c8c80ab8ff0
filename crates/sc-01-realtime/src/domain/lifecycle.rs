//! # Connection Lifecycle
//!
//! Pure state machine behind the connection driver:
//!
//! ```text
//! Disconnected ─connect─▶ Connecting ─opened─▶ Connected
//!      ▲                   │    ▲                  │
//!      │ exhausted         │    │ retry due        │ closed
//!      └───────────────────┴─▶ ReconnectPending ◀──┘
//! ```
//!
//! `teardown` returns to `Disconnected` from anywhere. No I/O or timers
//! here; the driver acts on the outcomes.

use std::time::Duration;

use super::policy::ReconnectPolicy;
use super::state::ConnectionState;

/// What the driver should do after the transport closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Sleep for `delay`, then attempt reconnect number `attempt`.
    Retry { attempt: u32, delay: Duration },
    /// Budget exhausted after `attempts` reconnects.
    Terminal { attempts: u32 },
    /// Close arrived in a state that has no open connection.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct ConnectionLifecycle {
    state: ConnectionState,
    policy: ReconnectPolicy,
}

impl ConnectionLifecycle {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            policy,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempt(&self) -> u32 {
        self.policy.attempt()
    }

    /// Explicit connect request. Returns `true` if an open should start.
    ///
    /// From `Disconnected` the retry budget starts fresh. From
    /// `ReconnectPending` the pending delay is skipped but the attempt count
    /// is kept.
    pub fn request_connect(&mut self) -> bool {
        match self.state {
            ConnectionState::Disconnected => {
                self.policy.reset();
                self.state = ConnectionState::Connecting;
                true
            }
            ConnectionState::ReconnectPending => {
                self.state = ConnectionState::Connecting;
                true
            }
            ConnectionState::Connecting | ConnectionState::Connected => false,
        }
    }

    /// Backoff delay elapsed. Returns `true` if an open should start.
    pub fn retry_due(&mut self) -> bool {
        if self.state == ConnectionState::ReconnectPending {
            self.state = ConnectionState::Connecting;
            true
        } else {
            false
        }
    }

    /// The transport opened.
    pub fn opened(&mut self) {
        self.state = ConnectionState::Connected;
        self.policy.reset();
    }

    /// The transport closed or failed to open.
    pub fn closed(&mut self) -> CloseOutcome {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => match self.policy.next_delay() {
                Some(delay) => {
                    self.state = ConnectionState::ReconnectPending;
                    CloseOutcome::Retry {
                        attempt: self.policy.attempt(),
                        delay,
                    }
                }
                None => {
                    self.state = ConnectionState::Disconnected;
                    CloseOutcome::Terminal {
                        attempts: self.policy.attempt(),
                    }
                }
            },
            ConnectionState::Disconnected | ConnectionState::ReconnectPending => CloseOutcome::Ignored,
        }
    }

    /// Give up on a pending reconnect. Returns the reconnects already made.
    pub fn abandon(&mut self) -> u32 {
        self.state = ConnectionState::Disconnected;
        self.policy.attempt()
    }

    /// User-initiated disconnect.
    pub fn teardown(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.policy.reset();
    }
}

impl Default for ConnectionLifecycle {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}
