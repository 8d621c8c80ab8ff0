//! Message-oriented transport to a single endpoint.

use async_trait::async_trait;

use crate::error::TransportError;

/// Opens physical connections.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, url: &str) -> Result<TransportSession, TransportError>;
}

/// Outbound half of an open connection.
#[async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Close the connection. Errors are swallowed; the peer may already be gone.
    async fn close(&mut self);
}

/// Inbound half of an open connection.
#[async_trait]
pub trait FrameStream: Send {
    /// Next text frame.
    ///
    /// `None` means the connection is closed. `Some(Err(_))` is a non-fatal
    /// error; callers keep reading.
    async fn next_frame(&mut self) -> Option<Result<String, TransportError>>;
}

/// One open connection, split into halves.
pub struct TransportSession {
    pub sink: Box<dyn FrameSink>,
    pub stream: Box<dyn FrameStream>,
}

impl TransportSession {
    pub fn new(sink: impl FrameSink + 'static, stream: impl FrameStream + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            stream: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSession").finish_non_exhaustive()
    }
}
