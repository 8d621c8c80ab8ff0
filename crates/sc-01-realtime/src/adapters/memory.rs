//! # In-Memory Transport
//!
//! Scriptable transport for tests and simulation. Every successful open
//! hands a [`ServerConnection`] to the paired [`InMemoryServer`], which
//! plays the remote endpoint: it sees outbound frames, pushes inbound
//! frames, and can drop the connection.
//!
//! ```
//! # async fn demo() {
//! use sc_01_realtime::adapters::InMemoryTransport;
//!
//! let (transport, mut server) = InMemoryTransport::pair();
//! server.refuse_next(2); // first two opens fail
//! # let _ = (transport, server.accept());
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::domain::ControlFrame;
use crate::error::{FrameError, TransportError};
use crate::ports::{FrameSink, FrameStream, Transport, TransportSession};

#[derive(Debug, Default)]
struct Script {
    refuse_next: usize,
    refuse_all: bool,
    hang: bool,
    opens: usize,
}

/// Client side of the in-memory transport.
#[derive(Clone)]
pub struct InMemoryTransport {
    script: Arc<Mutex<Script>>,
    accepted: mpsc::UnboundedSender<ServerConnection>,
}

/// Remote-endpoint side of the in-memory transport.
pub struct InMemoryServer {
    script: Arc<Mutex<Script>>,
    accepted: mpsc::UnboundedReceiver<ServerConnection>,
}

impl InMemoryTransport {
    /// Create a connected transport/server pair.
    pub fn pair() -> (Self, InMemoryServer) {
        let script = Arc::new(Mutex::new(Script::default()));
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                script: Arc::clone(&script),
                accepted: tx,
            },
            InMemoryServer { script, accepted: rx },
        )
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn open(&self, url: &str) -> Result<TransportSession, TransportError> {
        let (refused, hang) = {
            let mut script = self.script.lock();
            script.opens += 1;
            let refused = script.refuse_all || script.refuse_next > 0;
            script.refuse_next = script.refuse_next.saturating_sub(1);
            (refused, script.hang)
        };

        if hang {
            std::future::pending::<()>().await;
        }
        if refused {
            return Err(TransportError::Connect {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let (to_server, from_client) = mpsc::unbounded_channel();
        let (to_client, from_server) = mpsc::unbounded_channel();
        self.accepted
            .send(ServerConnection {
                to_client,
                from_client,
            })
            .map_err(|_| TransportError::Connect {
                url: url.to_string(),
                reason: "server is gone".to_string(),
            })?;

        Ok(TransportSession::new(
            MemorySink { to_server: Some(to_server) },
            MemoryStream { from_server },
        ))
    }
}

impl InMemoryServer {
    /// Refuse the next `n` open attempts.
    pub fn refuse_next(&self, n: usize) {
        self.script.lock().refuse_next = n;
    }

    /// Refuse every open attempt until turned off.
    pub fn refuse_all(&self, refuse: bool) {
        self.script.lock().refuse_all = refuse;
    }

    /// Make open attempts never complete until turned off.
    pub fn hang_opens(&self, hang: bool) {
        self.script.lock().hang = hang;
    }

    /// Open attempts seen so far, successful or not.
    pub fn open_attempts(&self) -> usize {
        self.script.lock().opens
    }

    /// Wait for the next successful open.
    pub async fn accept(&mut self) -> Option<ServerConnection> {
        self.accepted.recv().await
    }
}

enum ServerEvent {
    Frame(String),
    Error(String),
}

/// One accepted connection, seen from the remote end.
pub struct ServerConnection {
    to_client: mpsc::UnboundedSender<ServerEvent>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl ServerConnection {
    /// Deliver a raw inbound frame.
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.to_client.send(ServerEvent::Frame(frame.into()));
    }

    /// Deliver a JSON inbound frame.
    pub fn push_json(&self, frame: &Value) {
        self.push(frame.to_string());
    }

    /// Surface a non-fatal read error on the client.
    pub fn fail(&self, reason: impl Into<String>) {
        let _ = self.to_client.send(ServerEvent::Error(reason.into()));
    }

    /// Drop the connection from the server side.
    pub fn close(self) {}

    /// Next frame sent by the client; `None` once the client closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Next frame sent by the client, decoded as a control frame.
    pub async fn recv_control(&mut self) -> Option<Result<ControlFrame, FrameError>> {
        self.recv().await.map(|text| ControlFrame::decode(&text))
    }

    /// Every frame the client has sent that is already queued.
    pub fn drain(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.from_client.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

struct MemorySink {
    to_server: Option<mpsc::UnboundedSender<String>>,
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        let Some(tx) = self.to_server.as_ref() else {
            return Err(TransportError::Send("connection closed".to_string()));
        };
        tx.send(frame)
            .map_err(|_| TransportError::Send("server hung up".to_string()))
    }

    async fn close(&mut self) {
        self.to_server = None;
    }
}

struct MemoryStream {
    from_server: mpsc::UnboundedReceiver<ServerEvent>,
}

#[async_trait]
impl FrameStream for MemoryStream {
    async fn next_frame(&mut self) -> Option<Result<String, TransportError>> {
        match self.from_server.recv().await? {
            ServerEvent::Frame(text) => Some(Ok(text)),
            ServerEvent::Error(reason) => Some(Err(TransportError::Receive(reason))),
        }
    }
}
