//! # Adapters Layer
//!
//! Concrete [`Transport`](crate::ports::Transport) implementations.

pub mod memory;
pub mod websocket;

pub use memory::{InMemoryServer, InMemoryTransport, ServerConnection};
pub use websocket::WebSocketTransport;
