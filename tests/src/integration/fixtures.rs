//! Shared harness for the integration flows.

use std::sync::Arc;

use sc_01_realtime::adapters::{InMemoryServer, InMemoryTransport, ServerConnection};
use sc_01_realtime::{Command, RealtimeClient, RealtimeConfig};
use serde_json::{json, Value};
use shared_bus::{handler_fn, EventHandler};
use shared_crypto::generate_key_pair;
use shared_types::testing::RecordingObserver;
use shared_types::{KeyPair, Observer, SessionCredentials};
use tokio::sync::mpsc;

pub const TOKEN: &str = "session-token";

/// Session with a token and a fresh key pair.
pub fn credentials() -> Arc<SessionCredentials> {
    let (public, secret) = generate_key_pair();
    let credentials = SessionCredentials::with_token(TOKEN);
    credentials.set_key_pair(KeyPair::from_bytes(public, secret));
    Arc::new(credentials)
}

pub struct Realtime {
    pub client: RealtimeClient,
    pub server: InMemoryServer,
    pub observer: Arc<RecordingObserver>,
    pub credentials: Arc<SessionCredentials>,
}

/// Client over the in-memory transport, recording observations.
pub fn realtime(credentials: Arc<SessionCredentials>) -> Realtime {
    let observer = Arc::new(RecordingObserver::new());
    let (client, server) = realtime_with(credentials.clone(), observer.clone());
    Realtime {
        client,
        server,
        observer,
        credentials,
    }
}

pub fn realtime_with(
    credentials: Arc<SessionCredentials>,
    observer: Arc<dyn Observer>,
) -> (RealtimeClient, InMemoryServer) {
    let (transport, server) = InMemoryTransport::pair();
    let client = RealtimeClient::spawn(
        RealtimeConfig::default(),
        Arc::new(transport),
        credentials,
        observer,
    );
    (client, server)
}

/// Handler that forwards every payload to a channel.
pub fn recorder() -> (Arc<dyn EventHandler>, mpsc::UnboundedReceiver<Value>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = handler_fn(move |payload| {
        tx.send(payload.clone())?;
        Ok(())
    });
    (handler, rx)
}

/// Read `n` control frames and return `(command, channel, token)` for each.
pub async fn control_frames(conn: &mut ServerConnection, n: usize) -> Vec<(Command, String, String)> {
    let mut frames = Vec::with_capacity(n);
    for _ in 0..n {
        let frame = conn
            .recv_control()
            .await
            .expect("client hung up")
            .expect("valid control frame");
        frames.push((frame.command, frame.channel.clone(), frame.token().to_string()));
    }
    frames
}

pub fn event(channel: &str, action: &str, data: Value) -> Value {
    json!({ "channel": channel, "action": action, "data": data })
}

/// Yield until `cond` holds.
pub async fn until(cond: impl Fn() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
