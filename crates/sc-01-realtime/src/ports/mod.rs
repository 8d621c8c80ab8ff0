//! # Ports Layer
//!
//! - **Driven (outbound):** [`Transport`] and its session halves, supplied
//!   by adapters.
//! - **Driving (inbound):** [`ConnectionListener`], implemented by the
//!   message router and called from the connection driver task.

pub mod listener;
pub mod transport;

pub use listener::ConnectionListener;
pub use transport::{FrameSink, FrameStream, Transport, TransportSession};
