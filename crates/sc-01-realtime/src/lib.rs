//! # Realtime Subsystem
//!
//! **Subsystem ID:** 1
//!
//! Keeps one logical realtime channel alive over an unreliable network and
//! multiplexes many (channel, action) subscriptions onto it.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** connection state machine, backoff policy, frame codec
//! - **Ports Layer:** `Transport` (driven) and `ConnectionListener` (driving)
//! - **Adapters Layer:** tokio-tungstenite WebSocket and an in-memory transport
//! - **Service Layer:** connection driver actor, message router, client facade
//!
//! ## Reconnect behaviour
//!
//! | Event | Result |
//! |-------|--------|
//! | open succeeds | `Connected`, attempt reset, subscriptions replayed |
//! | close / failed open | `ReconnectPending`, retry after `base * 2^attempt` |
//! | close with budget spent | `Disconnected`, `TerminalFailure` |
//! | `disconnect()` | `Disconnected`, pending retry cancelled, registry cleared |
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sc_01_realtime::{RealtimeClient, RealtimeConfig};
//! use shared_bus::handler_fn;
//! use shared_types::{NoOpObserver, SessionCredentials};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RealtimeClient::websocket(
//!     RealtimeConfig::from_env()?,
//!     Arc::new(SessionCredentials::with_token("session-token")),
//!     Arc::new(NoOpObserver),
//! );
//! client.subscribe("message", "created", handler_fn(|payload| {
//!     println!("{payload}");
//!     Ok(())
//! }));
//! client.connect()?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use config::{RealtimeConfig, RealtimeConfigBuilder};
pub use domain::{
    ChannelEvent, Command, ConnectionState, ControlFrame, InboundFrame, LifecycleEvent, Notice,
    ReconnectPolicy,
};
pub use error::{ConfigError, ConnectionError, FrameError, TransportError};
pub use ports::{ConnectionListener, FrameSink, FrameStream, Transport, TransportSession};
pub use service::{ConnectionDriver, ConnectionManager, MessageRouter, RealtimeClient};
