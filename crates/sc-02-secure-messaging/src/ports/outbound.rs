//! Driven ports: the message store and the public-key directory.

use async_trait::async_trait;

use crate::domain::{Message, MessageId, NewMessage, UserId};
use crate::error::MessagingError;

/// Server-side message store.
///
/// Implementations only move ciphertext; nothing here sees plaintext.
#[async_trait]
pub trait MessageApi: Send + Sync {
    /// Store a message and return the server's record.
    async fn send(&self, message: &NewMessage) -> Result<Message, MessagingError>;

    /// Every message visible to the session user.
    async fn fetch(&self) -> Result<Vec<Message>, MessagingError>;

    /// Returns the updated record.
    async fn mark_as_read(&self, id: MessageId) -> Result<Message, MessagingError>;

    async fn revoke(&self, id: MessageId) -> Result<(), MessagingError>;
}

/// Resolves a user's long-lived X25519 public key.
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// # Errors
    ///
    /// `UserNotFound` for unknown users, `InvalidPublicKey` when the stored
    /// key does not decode to 32 bytes.
    async fn public_key(&self, user_id: UserId) -> Result<[u8; 32], MessagingError>;
}
