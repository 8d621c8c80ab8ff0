//! # Error Types
//!
//! Errors raised while decoding key material handed over by the session.

use thiserror::Error;

/// Errors that can occur while decoding a user's key pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyDecodeError {
    /// The key was not valid base64.
    #[error("Invalid base64 in {field}")]
    InvalidEncoding { field: &'static str },

    /// The decoded key had the wrong length.
    #[error("Invalid {field} length: expected {expected}, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}
