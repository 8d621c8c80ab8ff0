//! # Encrypted Envelope
//!
//! Ciphertext plus everything except keys needed to open it. On the wire
//! the envelope is a JSON object of base64 strings:
//!
//! ```json
//! { "encrypted": "...", "nonce": "...", "ephemeralPublicKey": "..." }
//! ```
//!
//! `ephemeralPublicKey` is only present on sealed envelopes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::CryptoError;

/// XSalsa20 nonce length.
pub const NONCE_LENGTH: usize = 24;

const PUBLIC_KEY_LENGTH: usize = 32;

/// Output of one encryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireEnvelope", into = "WireEnvelope")]
pub struct EncryptedEnvelope {
    /// Ciphertext including the 16-byte Poly1305 tag.
    pub ciphertext: Vec<u8>,
    /// Random nonce used for this message only.
    pub nonce: [u8; NONCE_LENGTH],
    /// Sender's per-message public key (sealed envelopes only).
    pub ephemeral_public_key: Option<[u8; PUBLIC_KEY_LENGTH]>,
}

impl EncryptedEnvelope {
    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> String {
        serde_json::Value::from(WireEnvelope::from(self.clone())).to_string()
    }

    /// Parse the JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, CryptoError> {
        let wire: WireEnvelope = serde_json::from_str(json)
            .map_err(|e| CryptoError::MalformedEnvelope(e.to_string()))?;
        Self::try_from(wire)
    }

    /// Base64 ciphertext, as stored in the `encrypted` field.
    pub fn ciphertext_base64(&self) -> String {
        STANDARD.encode(&self.ciphertext)
    }

    /// Base64 nonce, as stored in the `nonce` field.
    pub fn nonce_base64(&self) -> String {
        STANDARD.encode(self.nonce)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    encrypted: String,
    nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ephemeral_public_key: Option<String>,
}

impl From<WireEnvelope> for serde_json::Value {
    fn from(wire: WireEnvelope) -> Self {
        let mut map = serde_json::Map::new();
        map.insert("encrypted".into(), wire.encrypted.into());
        map.insert("nonce".into(), wire.nonce.into());
        if let Some(key) = wire.ephemeral_public_key {
            map.insert("ephemeralPublicKey".into(), key.into());
        }
        serde_json::Value::Object(map)
    }
}

impl From<EncryptedEnvelope> for WireEnvelope {
    fn from(envelope: EncryptedEnvelope) -> Self {
        Self {
            encrypted: STANDARD.encode(&envelope.ciphertext),
            nonce: STANDARD.encode(envelope.nonce),
            ephemeral_public_key: envelope.ephemeral_public_key.map(|k| STANDARD.encode(k)),
        }
    }
}

impl TryFrom<WireEnvelope> for EncryptedEnvelope {
    type Error = CryptoError;

    fn try_from(wire: WireEnvelope) -> Result<Self, Self::Error> {
        let ciphertext = decode_field("encrypted", &wire.encrypted)?;
        let nonce = decode_fixed::<NONCE_LENGTH>("nonce", &wire.nonce)?;
        let ephemeral_public_key = wire
            .ephemeral_public_key
            .as_deref()
            .map(|k| decode_fixed::<PUBLIC_KEY_LENGTH>("ephemeralPublicKey", k))
            .transpose()?;

        Ok(Self {
            ciphertext,
            nonce,
            ephemeral_public_key,
        })
    }
}

fn decode_field(field: &str, value: &str) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(value)
        .map_err(|e| CryptoError::MalformedEnvelope(format!("{field}: {e}")))
}

fn decode_fixed<const N: usize>(field: &str, value: &str) -> Result<[u8; N], CryptoError> {
    let bytes = decode_field(field, value)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| {
        CryptoError::MalformedEnvelope(format!("{field}: expected {N} bytes, got {len}"))
    })
}
