//! # Key Material
//!
//! The user's long-lived X25519 key pair as issued by the account service.
//! Keys arrive base64-encoded; decoding checks only the length; curve-level
//! validation is the crypto crate's job.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::KeyDecodeError;

/// Length of X25519 public and secret keys in bytes.
pub const KEY_LENGTH: usize = 32;

/// Secret key bytes, wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes([u8; KEY_LENGTH]);

impl SecretBytes {
    /// Wrap raw secret bytes.
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBytes(<redacted>)")
    }
}

/// A user's long-lived key pair.
#[derive(Clone, Debug)]
pub struct KeyPair {
    public_key: [u8; KEY_LENGTH],
    secret_key: SecretBytes,
}

impl KeyPair {
    /// Build a key pair from raw bytes.
    pub fn from_bytes(public_key: [u8; KEY_LENGTH], secret_key: [u8; KEY_LENGTH]) -> Self {
        Self {
            public_key,
            secret_key: SecretBytes::from_bytes(secret_key),
        }
    }

    /// Decode a key pair from the base64 strings carried in the user profile.
    pub fn from_base64(public_key: &str, secret_key: &str) -> Result<Self, KeyDecodeError> {
        let public_key = decode_key(public_key, "public_key")?;
        let secret_key = decode_key(secret_key, "private_key")?;
        Ok(Self::from_bytes(public_key, secret_key))
    }

    /// Public half.
    pub fn public_key(&self) -> &[u8; KEY_LENGTH] {
        &self.public_key
    }

    /// Secret half.
    pub fn secret_key(&self) -> &[u8; KEY_LENGTH] {
        self.secret_key.as_bytes()
    }

    /// Public half as base64, the form peers look it up in.
    pub fn public_key_base64(&self) -> String {
        STANDARD.encode(self.public_key)
    }
}

fn decode_key(encoded: &str, field: &'static str) -> Result<[u8; KEY_LENGTH], KeyDecodeError> {
    let mut raw = STANDARD
        .decode(encoded.trim())
        .map_err(|_| KeyDecodeError::InvalidEncoding { field })?;

    let result = <[u8; KEY_LENGTH]>::try_from(raw.as_slice()).map_err(|_| {
        KeyDecodeError::InvalidLength {
            field,
            expected: KEY_LENGTH,
            actual: raw.len(),
        }
    });
    raw.zeroize();
    result
}
