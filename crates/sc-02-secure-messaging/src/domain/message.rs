//! Message records.
//!
//! Field names follow the API's `attributes` objects. Everything the client
//! computes locally (plaintext, digest, decryption outcome) is skipped by
//! serde and never leaves the process.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared_crypto::CryptoError;
use thiserror::Error;

pub type UserId = u64;
pub type MessageId = u64;

/// `status` of a message its sender withdrew.
pub const STATUS_REVOKED: &str = "revoked";

/// Content type of every message this client sends.
pub const CONTENT_TYPE_TEXT: &str = "text";

/// A stored message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub content_type: String,
    pub size: u64,
    pub status: String,
    pub is_read: bool,
    pub read_at: Option<String>,
    pub expires_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub metadata: Map<String, Value>,
    /// JSON envelope as produced by the sender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_content: Option<String>,

    #[serde(skip)]
    pub decrypted_content: Option<String>,
    /// Hex SHA-256 of `decrypted_content`.
    #[serde(skip)]
    pub content_hash: Option<String>,
    #[serde(skip)]
    pub decryption: DecryptionStatus,
    #[serde(skip)]
    pub integrity: Integrity,
}

impl Message {
    pub fn is_encrypted(&self) -> bool {
        self.encrypted_content.is_some()
    }

    pub fn is_revoked(&self) -> bool {
        self.status == STATUS_REVOKED
    }

    /// The other participant, seen from `me`.
    pub fn counterparty(&self, me: UserId) -> UserId {
        if self.sender_id == me {
            self.recipient_id
        } else {
            self.sender_id
        }
    }

    /// Digest the server or sender attached under `metadata.content_hash`.
    pub fn expected_content_hash(&self) -> Option<&str> {
        self.metadata.get("content_hash").and_then(Value::as_str)
    }

    /// Merge the fields an update carries.
    pub fn apply(&mut self, update: &MessageUpdate) {
        if update.id != self.id {
            return;
        }
        if let Some(status) = &update.status {
            self.status = status.clone();
        }
        if let Some(is_read) = update.is_read {
            self.is_read = is_read;
        }
        if update.read_at.is_some() {
            self.read_at = update.read_at.clone();
        }
        if let Some(updated_at) = &update.updated_at {
            self.updated_at = updated_at.clone();
        }
    }
}

/// Body of a send request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub recipient_id: UserId,
    /// Envelope JSON; never plaintext.
    pub content: String,
    pub content_type: String,
}

impl NewMessage {
    pub fn text(recipient_id: UserId, content: impl Into<String>) -> Self {
        Self {
            recipient_id,
            content: content.into(),
            content_type: CONTENT_TYPE_TEXT.to_string(),
        }
    }
}

/// Partial record carried by `message/updated` events.
///
/// Absent fields leave the local record unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageUpdate {
    pub id: MessageId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl MessageUpdate {
    /// Update that marks `message` as read, taking the server's timestamps.
    pub fn read_receipt(message: &Message) -> Self {
        Self {
            id: message.id,
            is_read: Some(true),
            read_at: message.read_at.clone(),
            updated_at: Some(message.updated_at.clone()).filter(|s| !s.is_empty()),
            ..Self::default()
        }
    }

    pub fn revoked(id: MessageId) -> Self {
        Self {
            id,
            status: Some(STATUS_REVOKED.to_string()),
            ..Self::default()
        }
    }
}

/// Outcome of opening a record's envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DecryptionStatus {
    /// The record carries no encrypted content.
    #[default]
    NotEncrypted,
    Decrypted,
    /// No plaintext is attached.
    Failed(DecryptFailure),
}

impl DecryptionStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Why an envelope could not be opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptFailure {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("no key pair available")]
    MissingKeyPair,

    #[error("public key of user {user_id} unavailable: {reason}")]
    KeyLookup { user_id: UserId, reason: String },
}

/// Result of checking plaintext against `metadata.content_hash`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Integrity {
    /// No digest to compare against.
    #[default]
    Unchecked,
    Verified,
    Mismatch,
}
