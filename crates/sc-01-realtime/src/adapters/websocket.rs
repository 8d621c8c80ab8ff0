//! WebSocket transport over tokio-tungstenite.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::ports::{FrameSink, FrameStream, Transport, TransportSession};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens `ws://` and `wss://` connections.
///
/// Protocol-level ping/pong is answered by tungstenite; only text frames
/// (and UTF-8 binary frames) reach the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, url: &str) -> Result<TransportSession, TransportError> {
        let (stream, response) = connect_async(url).await.map_err(|e| TransportError::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        debug!(url, status = %response.status(), "WebSocket handshake complete");

        let (write, read) = stream.split();
        Ok(TransportSession::new(
            WsSink { inner: write },
            WsFrames {
                inner: read,
                failed: false,
            },
        ))
    }
}

struct WsSink {
    inner: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.inner
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.inner.close().await {
            debug!(error = %e, "WebSocket close failed");
        }
    }
}

struct WsFrames {
    inner: SplitStream<WsStream>,
    /// Set after a read error; the connection is treated as closed next.
    failed: bool,
}

#[async_trait]
impl FrameStream for WsFrames {
    async fn next_frame(&mut self) -> Option<Result<String, TransportError>> {
        if self.failed {
            return None;
        }

        loop {
            match self.inner.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => {
                    return Some(String::from_utf8(bytes.to_vec()).map_err(|_| {
                        TransportError::Receive("binary frame is not UTF-8".to_string())
                    }));
                }
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "WebSocket closed by peer");
                    return None;
                }
                Ok(other) => trace!(?other, "Ignoring control frame"),
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return None;
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(TransportError::Receive(e.to_string())));
                }
            }
        }
    }
}
