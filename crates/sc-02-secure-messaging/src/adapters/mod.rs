//! # Adapters Layer
//!
//! [`HttpMessageApi`] talks to the REST API; the in-memory store backs
//! tests and local simulation.

pub mod http;
pub mod memory;

pub use http::HttpMessageApi;
pub use memory::{InMemoryMessageApi, InMemoryMessageStore, StaticKeyDirectory};
