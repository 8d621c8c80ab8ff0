//! Encrypted send, fetch and record updates.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::RwLock;
use shared_crypto::{CryptoEngine, CryptoError, EncryptedEnvelope};
use shared_types::CredentialProvider;
use tracing::{debug, info, warn};

use crate::adapters::HttpMessageApi;
use crate::config::MessagingConfig;
use crate::domain::{
    DecryptFailure, DecryptionStatus, Integrity, Message, MessageId, MessageUpdate, NewMessage,
    UserId,
};
use crate::error::MessagingError;
use crate::ports::{KeyDirectory, MessageApi};

/// The session user's end of every conversation.
///
/// Plaintext never reaches [`MessageApi`]; the server only stores envelope
/// JSON. Counterparty public keys are cached after the first lookup.
pub struct SecureMessenger {
    user_id: UserId,
    api: Arc<dyn MessageApi>,
    directory: Arc<dyn KeyDirectory>,
    credentials: Arc<dyn CredentialProvider>,
    crypto: CryptoEngine,
    seal_outgoing: bool,
    key_cache: RwLock<HashMap<UserId, [u8; 32]>>,
}

impl SecureMessenger {
    pub fn new(
        user_id: UserId,
        api: Arc<dyn MessageApi>,
        directory: Arc<dyn KeyDirectory>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            user_id,
            api,
            directory,
            credentials,
            crypto: CryptoEngine::new(),
            seal_outgoing: false,
            key_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Messages and keys both served by the REST API.
    pub fn over_http(
        user_id: UserId,
        config: MessagingConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, MessagingError> {
        let seal = config.seal_outgoing;
        let http = Arc::new(HttpMessageApi::new(config, Arc::clone(&credentials))?);
        Ok(Self::new(user_id, http.clone(), http, credentials).with_sealing(seal))
    }

    /// Send under one-time sender keys instead of the long-lived pair.
    pub fn with_sealing(mut self, seal: bool) -> Self {
        self.seal_outgoing = seal;
        self
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Encrypt `plaintext` for `recipient_id` and store it.
    ///
    /// The returned record carries the plaintext locally.
    pub async fn send(&self, recipient_id: UserId, plaintext: &str) -> Result<Message, MessagingError> {
        let key_pair = self
            .credentials
            .key_pair()
            .ok_or(MessagingError::MissingCredential("key pair"))?;
        let recipient_key = self.public_key_for(recipient_id, false).await?;

        let envelope = if self.seal_outgoing {
            self.crypto.seal(plaintext, &recipient_key)?
        } else {
            self.crypto
                .encrypt(plaintext, &recipient_key, key_pair.secret_key())?
        };

        let mut stored = self
            .api
            .send(&NewMessage::text(recipient_id, envelope.to_json()))
            .await?;
        stored.content_hash = Some(self.crypto.hash(plaintext));
        stored.decrypted_content = Some(plaintext.to_string());
        stored.decryption = DecryptionStatus::Decrypted;

        info!(
            message_id = stored.id,
            recipient_id,
            sealed = self.seal_outgoing,
            "Encrypted message sent"
        );
        Ok(stored)
    }

    /// Fetch every visible message and open each envelope.
    ///
    /// One undecryptable record does not fail the batch; it comes back
    /// marked [`DecryptionStatus::Failed`] with no plaintext.
    pub async fn fetch(&self) -> Result<Vec<Message>, MessagingError> {
        let records = self.api.fetch().await?;
        debug!(count = records.len(), "Fetched messages");
        Ok(join_all(records.into_iter().map(|record| self.open(record))).await)
    }

    pub async fn mark_as_read(&self, id: MessageId) -> Result<MessageUpdate, MessagingError> {
        let record = self.api.mark_as_read(id).await?;
        Ok(MessageUpdate::read_receipt(&record))
    }

    pub async fn revoke(&self, id: MessageId) -> Result<MessageUpdate, MessagingError> {
        self.api.revoke(id).await?;
        info!(message_id = id, "Message revoked");
        Ok(MessageUpdate::revoked(id))
    }

    /// Drop a cached public key, e.g. after the user announced a new one.
    pub fn forget_key(&self, user_id: UserId) {
        self.key_cache.write().remove(&user_id);
    }

    /// Attach plaintext, digest and integrity verdict to a record.
    pub async fn open(&self, mut message: Message) -> Message {
        let Some(content) = message.encrypted_content.clone() else {
            return message;
        };

        match self.decrypt_content(&message, &content).await {
            Ok(plaintext) => {
                message.integrity = match message.expected_content_hash() {
                    Some(expected) if self.crypto.verify_integrity(&plaintext, expected) => {
                        Integrity::Verified
                    }
                    Some(_) => {
                        warn!(message_id = message.id, "Content hash mismatch");
                        Integrity::Mismatch
                    }
                    None => Integrity::Unchecked,
                };
                message.content_hash = Some(self.crypto.hash(&plaintext));
                message.decrypted_content = Some(plaintext);
                message.decryption = DecryptionStatus::Decrypted;
            }
            Err(failure) => {
                warn!(message_id = message.id, error = %failure, "Message could not be decrypted");
                message.decrypted_content = None;
                message.content_hash = None;
                message.decryption = DecryptionStatus::Failed(failure);
            }
        }
        message
    }

    async fn decrypt_content(&self, message: &Message, content: &str) -> Result<String, DecryptFailure> {
        let envelope = EncryptedEnvelope::from_json(content)?;
        let key_pair = self
            .credentials
            .key_pair()
            .ok_or(DecryptFailure::MissingKeyPair)?;

        let sealed = envelope.ephemeral_public_key.is_some();
        if sealed && message.recipient_id == self.user_id {
            if let Ok(plaintext) = self.crypto.open_sealed(&envelope, key_pair.secret_key()) {
                return Ok(plaintext);
            }
        }

        let counterparty = message.counterparty(self.user_id);
        let key = self.counterparty_key(counterparty, false).await?;
        let result = self.crypto.decrypt(&envelope, &key, key_pair.secret_key());
        // A sender cannot open its own sealed envelopes; a fresh key won't help.
        let may_have_rotated =
            counterparty != self.user_id && !(sealed && message.sender_id == self.user_id);
        match result {
            Err(CryptoError::AuthenticationFailed) if may_have_rotated => {
                let fresh = match self.counterparty_key(counterparty, true).await {
                    Ok(fresh) => fresh,
                    Err(failure) => {
                        debug!(user_id = counterparty, error = %failure, "Key refresh failed");
                        return Err(CryptoError::AuthenticationFailed.into());
                    }
                };
                if fresh == key {
                    return Err(CryptoError::AuthenticationFailed.into());
                }
                Ok(self.crypto.decrypt(&envelope, &fresh, key_pair.secret_key())?)
            }
            result => Ok(result?),
        }
    }

    async fn counterparty_key(&self, user_id: UserId, refresh: bool) -> Result<[u8; 32], DecryptFailure> {
        self.public_key_for(user_id, refresh)
            .await
            .map_err(|e| DecryptFailure::KeyLookup {
                user_id,
                reason: e.to_string(),
            })
    }

    async fn public_key_for(&self, user_id: UserId, refresh: bool) -> Result<[u8; 32], MessagingError> {
        if user_id == self.user_id {
            let key_pair = self
                .credentials
                .key_pair()
                .ok_or(MessagingError::MissingCredential("key pair"))?;
            return Ok(*key_pair.public_key());
        }
        // A refresh bypasses the cache but only replaces the entry on success.
        if !refresh {
            if let Some(key) = self.key_cache.read().get(&user_id) {
                return Ok(*key);
            }
        }

        let key = self.directory.public_key(user_id).await?;
        self.key_cache.write().insert(user_id, key);
        Ok(key)
    }
}

impl std::fmt::Debug for SecureMessenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureMessenger")
            .field("user_id", &self.user_id)
            .field("seal_outgoing", &self.seal_outgoing)
            .field("cached_keys", &self.key_cache.read().len())
            .finish()
    }
}
