//! Secure messaging error types.

use shared_crypto::CryptoError;
use thiserror::Error;

use crate::domain::UserId;

/// Errors from sending, fetching or updating messages.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// The session has no token or no key pair.
    #[error("Missing credential: no {0} available")]
    MissingCredential(&'static str),

    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// The directory returned a key that is not 32 base64-encoded bytes.
    #[error("User {user_id} has an unusable public key: {reason}")]
    InvalidPublicKey { user_id: UserId, reason: String },

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The server rejected the session token.
    #[error("Unauthorized: session token rejected")]
    Unauthorized,

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}
