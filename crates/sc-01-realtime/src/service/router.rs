//! # Message Router
//!
//! Bridges the [`SubscriptionRegistry`] and the connection:
//!
//! - registrations become subscribe/unsubscribe control frames;
//! - every (re)connect replays one subscribe per distinct channel;
//! - inbound frames are classified and fanned out to handlers.

use std::sync::Arc;

use parking_lot::Mutex;
use shared_bus::{DispatchReport, EventHandler, SubscriptionId, SubscriptionRegistry};
use shared_types::{CredentialProvider, Observer};
use tracing::{debug, info, trace, warn};

use crate::domain::{Command, ControlFrame, InboundFrame, Notice};
use crate::ports::ConnectionListener;
use crate::service::connection::ConnectionManager;

pub struct MessageRouter {
    registry: Mutex<SubscriptionRegistry>,
    connection: ConnectionManager,
    credentials: Arc<dyn CredentialProvider>,
    observer: Arc<dyn Observer>,
}

impl MessageRouter {
    pub fn new(
        connection: ConnectionManager,
        credentials: Arc<dyn CredentialProvider>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            registry: Mutex::new(SubscriptionRegistry::new()),
            connection,
            credentials,
            observer,
        }
    }

    /// Register `handler` for (channel, action).
    ///
    /// While connected a subscribe frame for `channel` goes out immediately;
    /// otherwise the next connect replays it.
    pub fn subscribe(
        &self,
        channel: impl Into<String>,
        action: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> SubscriptionId {
        let channel = channel.into();
        let id = self.registry.lock().add(channel.clone(), action, handler);

        if self.connection.is_connected() {
            self.send_control(Command::Subscribe, &channel);
        }
        id
    }

    /// Remove one registration (`Some(id)`) or every registration for
    /// (channel, action) (`None`).
    ///
    /// An unsubscribe frame goes out only when `channel` has no remaining
    /// registrations for any action. Returns the number removed.
    pub fn unsubscribe(&self, channel: &str, action: &str, id: Option<SubscriptionId>) -> usize {
        let (removed, still_used) = {
            let mut registry = self.registry.lock();
            let removed = registry.remove(channel, action, id);
            (removed, registry.has_channel(channel))
        };

        if removed > 0 && !still_used && self.connection.is_connected() {
            self.send_control(Command::Unsubscribe, channel);
        }
        removed
    }

    /// Distinct subscribed channels, first registration first.
    pub fn channels(&self) -> Vec<String> {
        self.registry.lock().distinct_channels()
    }

    /// Total registrations.
    pub fn subscription_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Classify and dispatch one inbound frame.
    pub fn route(&self, raw: &str) -> Option<DispatchReport> {
        match InboundFrame::parse(raw) {
            Ok(InboundFrame::Ping) => {
                trace!("Ping");
                None
            }
            Ok(InboundFrame::Notice(notice)) => {
                self.handle_notice(notice, raw);
                None
            }
            Ok(InboundFrame::Event(event)) => {
                let batch = self.registry.lock().snapshot(&event.channel, &event.action);
                if batch.is_empty() {
                    debug!(channel = %event.channel, action = %event.action, "No handlers for event");
                }
                Some(batch.deliver(&event.data, self.observer.as_ref()))
            }
            Err(e) => {
                warn!(error = %e, "Dropping malformed frame");
                self.observer.frame_dropped(&e.to_string(), raw);
                None
            }
        }
    }

    fn handle_notice(&self, notice: Notice, raw: &str) {
        match notice {
            Notice::Welcome => debug!("Server welcome"),
            Notice::ConfirmSubscription { identifier } => {
                let channel = identifier.as_deref().map(channel_of).unwrap_or_default();
                debug!(channel = %channel, "Subscription confirmed");
            }
            Notice::RejectSubscription { identifier } => {
                let channel = identifier.as_deref().map(channel_of).unwrap_or_default();
                warn!(channel = %channel, "Subscription rejected by server");
                self.observer.frame_dropped("subscription rejected", raw);
            }
            Notice::Disconnect { reason } => {
                info!(reason = reason.as_deref().unwrap_or("unspecified"), "Server announced disconnect");
            }
            Notice::Other(kind) => trace!(kind = %kind, "Ignoring notice"),
        }
    }

    fn replay(&self) {
        let channels = self.registry.lock().distinct_channels();
        info!(channels = channels.len(), "Replaying subscriptions");
        for channel in &channels {
            self.send_control(Command::Subscribe, channel);
        }
    }

    /// Build and queue a control frame with the token current right now.
    fn send_control(&self, command: Command, channel: &str) {
        let Some(token) = self.credentials.token() else {
            warn!(channel, command = %command, "Control frame not sent: no session token");
            self.observer
                .frame_dropped("missing credential", &format!("{command} {channel}"));
            return;
        };

        debug!(channel, command = %command, "Sending control frame");
        let frame = ControlFrame::new(command, channel, token);
        if let Err(e) = self.connection.send(frame.encode()) {
            debug!(error = %e, "Control frame not queued");
        }
    }
}

/// Channel name out of a server-echoed identifier, without the token.
fn channel_of(identifier: &str) -> String {
    serde_json::from_str::<serde_json::Value>(identifier)
        .ok()
        .and_then(|v| v.get("channel").and_then(|c| c.as_str()).map(str::to_string))
        .unwrap_or_default()
}

impl ConnectionListener for MessageRouter {
    fn on_connected(&self) {
        self.replay();
    }

    fn on_frame(&self, frame: &str) {
        self.route(frame);
    }

    fn on_teardown(&self) {
        let mut registry = self.registry.lock();
        debug!(cleared = registry.len(), "Clearing subscriptions");
        registry.clear();
    }

    fn on_terminal_failure(&self, attempts: u32, reason: &str) {
        info!(
            attempts,
            reason,
            channels = self.registry.lock().distinct_channels().len(),
            "Keeping subscriptions for a manual reconnect"
        );
    }
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("registry", &*self.registry.lock())
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}
