//! Live inbox over the realtime channel.
//!
//! `message/created` and `message/updated` handlers run on the connection
//! driver task, so they only parse and enqueue. A worker task opens the
//! envelopes one at a time and emits [`InboxEvent`]s in arrival order.

use std::sync::{Arc, Weak};

use sc_01_realtime::MessageRouter;
use serde_json::Value;
use shared_bus::{handler_fn, HandlerError, SubscriptionId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::{InboxEvent, Message, MessageUpdate};
use crate::service::messenger::SecureMessenger;

pub const MESSAGE_CHANNEL: &str = "message";
pub const ACTION_CREATED: &str = "created";
pub const ACTION_UPDATED: &str = "updated";

#[derive(Debug)]
enum InboxJob {
    Created(Message),
    Updated(MessageUpdate),
}

/// Receiving end of an attached messenger.
///
/// The stream ends when the subscriptions go away, either through
/// [`detach`](Self::detach), by dropping the inbox, or because a user
/// disconnect cleared the router. Attach again after reconnecting.
pub struct Inbox {
    events: mpsc::UnboundedReceiver<InboxEvent>,
    router: Weak<MessageRouter>,
    subscriptions: Vec<(&'static str, SubscriptionId)>,
    worker: Option<JoinHandle<()>>,
}

impl Inbox {
    /// Next event, or `None` once the inbox is closed and drained.
    pub async fn recv(&mut self) -> Option<InboxEvent> {
        self.events.recv().await
    }

    /// Remove this inbox's handlers and wait for the worker to finish.
    pub async fn detach(mut self) {
        self.release();
        self.events.close();
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                debug!(error = %e, "Inbox worker ended abnormally");
            }
        }
    }

    fn release(&mut self) {
        let subscriptions = std::mem::take(&mut self.subscriptions);
        let Some(router) = self.router.upgrade() else {
            return;
        };
        for (action, id) in subscriptions {
            router.unsubscribe(MESSAGE_CHANNEL, action, Some(id));
        }
    }
}

impl Drop for Inbox {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Inbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inbox")
            .field("subscriptions", &self.subscriptions)
            .finish()
    }
}

impl SecureMessenger {
    /// Subscribe to message events on `router`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn attach(self: &Arc<Self>, router: &Arc<MessageRouter>) -> Inbox {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let created = {
            let jobs = jobs_tx.clone();
            handler_fn(move |payload| {
                jobs.send(InboxJob::Created(parse_created(payload)?))?;
                Ok(())
            })
        };
        let updated = handler_fn(move |payload| {
            jobs_tx.send(InboxJob::Updated(parse_updated(payload)?))?;
            Ok(())
        });

        let subscriptions = vec![
            (ACTION_CREATED, router.subscribe(MESSAGE_CHANNEL, ACTION_CREATED, created)),
            (ACTION_UPDATED, router.subscribe(MESSAGE_CHANNEL, ACTION_UPDATED, updated)),
        ];
        let worker = tokio::spawn(run_worker(Arc::clone(self), jobs_rx, events_tx));
        info!(user_id = self.user_id(), "Inbox attached");

        Inbox {
            events: events_rx,
            router: Arc::downgrade(router),
            subscriptions,
            worker: Some(worker),
        }
    }
}

async fn run_worker(
    messenger: Arc<SecureMessenger>,
    mut jobs: mpsc::UnboundedReceiver<InboxJob>,
    events: mpsc::UnboundedSender<InboxEvent>,
) {
    while let Some(job) = jobs.recv().await {
        let event = match job {
            InboxJob::Created(message) => InboxEvent::Received(messenger.open(message).await),
            InboxJob::Updated(update) => InboxEvent::Updated(update),
        };
        if events.send(event).is_err() {
            break;
        }
    }
    debug!("Inbox worker stopped");
}

/// `{"data": {"id": ..., "attributes": {...}}}`
fn parse_created(payload: &Value) -> Result<Message, HandlerError> {
    let attributes = payload
        .pointer("/data/attributes")
        .ok_or("message/created payload has no data.attributes")?;
    let mut message: Message = serde_json::from_value(attributes.clone())?;
    if message.id == 0 {
        if let Some(id) = payload.pointer("/data/id").and_then(json_id) {
            message.id = id;
        }
    }
    Ok(message)
}

/// Either a bare partial record or the same wrapped like a created event.
fn parse_updated(payload: &Value) -> Result<MessageUpdate, HandlerError> {
    let record = payload.pointer("/data/attributes").unwrap_or(payload);
    let update: MessageUpdate = serde_json::from_value(record.clone())?;
    if update.id == 0 {
        return Err("message/updated payload has no id".into());
    }
    Ok(update)
}

fn json_id(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}
