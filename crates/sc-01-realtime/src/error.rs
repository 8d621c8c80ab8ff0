//! Realtime subsystem error types.

use thiserror::Error;

/// Errors returned synchronously by the connection handle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// No session token is available; connecting is pointless.
    #[error("Missing credential: no session token available")]
    MissingCredential,

    /// The connection driver task has exited.
    #[error("Connection driver has stopped")]
    DriverStopped,
}

/// Errors raised by a [`Transport`](crate::ports::Transport) adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be opened.
    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// An outbound frame could not be written.
    #[error("Failed to send frame: {0}")]
    Send(String),

    /// Reading from the connection failed.
    #[error("Receive failed: {0}")]
    Receive(String),
}

/// Errors classifying an inbound frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Frame is not a JSON object")]
    NotAnObject,

    #[error("Frame has no `{0}` field")]
    MissingField(&'static str),

    #[error("Unknown command `{0}`")]
    UnknownCommand(String),
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}
