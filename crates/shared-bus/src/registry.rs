//! # Subscription Registry
//!
//! Ordered mapping from (channel, action) to handlers.
//!
//! Entries are keyed by a monotonically increasing [`SubscriptionId`], so
//! iterating the map yields registration order. The registry itself is not
//! synchronized; owners wrap it in a lock and take a [`DispatchBatch`]
//! snapshot before invoking handlers so the lock is never held across
//! user code.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use shared_types::Observer;
use tracing::debug;

use crate::dispatch::{DispatchBatch, DispatchReport};
use crate::handler::EventHandler;

/// Handle identifying one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw numeric id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct Entry {
    channel: String,
    action: String,
    handler: Arc<dyn EventHandler>,
}

impl Entry {
    fn matches(&self, channel: &str, action: &str) -> bool {
        self.channel == channel && self.action == action
    }
}

/// Registered handlers in registration order.
#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: BTreeMap<SubscriptionId, Entry>,
    next_id: u64,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for (channel, action).
    ///
    /// Never deduplicates: registering the same handler twice yields two
    /// entries and two invocations per matching event.
    pub fn add(
        &mut self,
        channel: impl Into<String>,
        action: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        let entry = Entry {
            channel: channel.into(),
            action: action.into(),
            handler,
        };
        debug!(channel = %entry.channel, action = %entry.action, subscription = %id, "Handler registered");
        self.entries.insert(id, entry);
        id
    }

    /// Remove registrations for (channel, action).
    ///
    /// With `Some(id)` only that entry is removed, and only if it belongs to
    /// (channel, action). With `None` every entry for the pair is removed.
    /// Returns the number of entries removed.
    pub fn remove(&mut self, channel: &str, action: &str, id: Option<SubscriptionId>) -> usize {
        let removed = match id {
            Some(id) => {
                let owned = self
                    .entries
                    .get(&id)
                    .is_some_and(|entry| entry.matches(channel, action));
                if owned {
                    self.entries.remove(&id);
                    1
                } else {
                    0
                }
            }
            None => {
                let before = self.entries.len();
                self.entries.retain(|_, entry| !entry.matches(channel, action));
                before - self.entries.len()
            }
        };

        if removed > 0 {
            debug!(channel, action, removed, "Handlers removed");
        }
        removed
    }

    /// Every channel with at least one registration, in order of the
    /// earliest surviving registration.
    pub fn distinct_channels(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entries
            .values()
            .filter(|entry| seen.insert(entry.channel.as_str()))
            .map(|entry| entry.channel.clone())
            .collect()
    }

    /// Whether any registration exists for `channel`, regardless of action.
    pub fn has_channel(&self, channel: &str) -> bool {
        self.entries.values().any(|entry| entry.channel == channel)
    }

    /// Number of registrations for (channel, action).
    pub fn count(&self, channel: &str, action: &str) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.matches(channel, action))
            .count()
    }

    /// Total number of registrations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no registrations.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every registration. Ids are not reused afterwards.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Copy out the handlers matching (channel, action), in registration order.
    pub fn snapshot(&self, channel: &str, action: &str) -> DispatchBatch {
        let targets = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.matches(channel, action))
            .map(|(id, entry)| (*id, Arc::clone(&entry.handler)))
            .collect();
        DispatchBatch::new(channel, action, targets)
    }

    /// Snapshot and deliver in one step.
    ///
    /// Only usable when the caller owns the registry outright; handlers that
    /// need to touch the registry must go through [`snapshot`](Self::snapshot).
    pub fn dispatch(&self, channel: &str, action: &str, payload: &Value, observer: &dyn Observer) -> DispatchReport {
        self.snapshot(channel, action).deliver(payload, observer)
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("registrations", &self.entries.len())
            .field("channels", &self.distinct_channels())
            .finish()
    }
}
