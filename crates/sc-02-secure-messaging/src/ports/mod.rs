//! # Ports Layer
//!
//! Outbound dependencies of the messaging service. The HTTP adapter
//! implements both; tests use the in-memory ones.

pub mod outbound;

pub use outbound::{KeyDirectory, MessageApi};
