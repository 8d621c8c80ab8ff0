//! # Service Layer
//!
//! Wires the domain to the ports: the connection driver actor, the message
//! router, and the [`RealtimeClient`] facade that assembles them.

pub mod client;
pub mod connection;
pub mod router;

pub use client::RealtimeClient;
pub use connection::{ConnectionDriver, ConnectionManager};
pub use router::MessageRouter;
