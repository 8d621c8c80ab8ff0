//! # Crypto Engine
//!
//! Stateless facade over [`box_cipher`](crate::box_cipher) and
//! [`hashing`](crate::hashing). Keys are supplied on every call and never
//! retained, so one engine can be shared freely across tasks.

use crate::box_cipher;
use crate::envelope::EncryptedEnvelope;
use crate::hashing;
use crate::CryptoError;

/// Message encryption and integrity hashing.
#[derive(Debug, Default, Clone, Copy)]
pub struct CryptoEngine;

impl CryptoEngine {
    /// Create an engine.
    pub fn new() -> Self {
        Self
    }

    /// See [`box_cipher::encrypt`].
    pub fn encrypt(
        &self,
        plaintext: &str,
        recipient_public_key: &[u8],
        sender_secret_key: &[u8],
    ) -> Result<EncryptedEnvelope, CryptoError> {
        box_cipher::encrypt(plaintext, recipient_public_key, sender_secret_key)
    }

    /// See [`box_cipher::decrypt`].
    pub fn decrypt(
        &self,
        envelope: &EncryptedEnvelope,
        counterparty_public_key: &[u8],
        own_secret_key: &[u8],
    ) -> Result<String, CryptoError> {
        box_cipher::decrypt(envelope, counterparty_public_key, own_secret_key)
    }

    /// See [`box_cipher::seal`].
    pub fn seal(
        &self,
        plaintext: &str,
        recipient_public_key: &[u8],
    ) -> Result<EncryptedEnvelope, CryptoError> {
        box_cipher::seal(plaintext, recipient_public_key)
    }

    /// See [`box_cipher::open_sealed`].
    pub fn open_sealed(
        &self,
        envelope: &EncryptedEnvelope,
        own_secret_key: &[u8],
    ) -> Result<String, CryptoError> {
        box_cipher::open_sealed(envelope, own_secret_key)
    }

    /// SHA-256 hex digest of `message`.
    pub fn hash(&self, message: &str) -> String {
        hashing::hash(message)
    }

    /// Compare `message` against a full hex digest.
    pub fn verify_integrity(&self, message: &str, expected: &str) -> bool {
        hashing::verify_integrity(message, expected)
    }
}
