//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
///
/// `AuthenticationFailed` is deliberately distinct from `MalformedEnvelope`:
/// the first means the bytes were well-formed but not produced by the
/// claimed key pair, the second means the envelope could not even be read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// A public or secret key is not usable key material
    #[error("Invalid {role} key: {reason}")]
    InvalidKey {
        /// Which key was rejected ("public" or "secret")
        role: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Ciphertext failed Poly1305 authentication
    #[error("Authentication failed: ciphertext was not produced by this key pair or was modified")]
    AuthenticationFailed,

    /// Envelope could not be parsed
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Sealed envelope is missing its ephemeral public key
    #[error("Envelope carries no ephemeral public key")]
    MissingEphemeralKey,

    /// Authenticated plaintext was not UTF-8
    #[error("Decrypted content is not valid UTF-8")]
    InvalidPlaintext,

    /// Encryption failed
    #[error("Encryption failed")]
    EncryptionFailed,
}
