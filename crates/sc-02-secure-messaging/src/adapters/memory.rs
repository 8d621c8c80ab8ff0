//! In-memory message store and key directory.
//!
//! One [`InMemoryMessageStore`] plays the server for any number of users;
//! each [`InMemoryMessageApi`] is one user's session against it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::domain::{Message, MessageId, NewMessage, UserId, STATUS_REVOKED};
use crate::error::MessagingError;
use crate::ports::{KeyDirectory, MessageApi};

/// Timestamp stamped on every record the store writes.
pub const STORE_TIMESTAMP: &str = "2024-01-01T00:00:00Z";

#[derive(Debug, Default)]
struct Store {
    messages: Vec<Message>,
    next_id: MessageId,
}

/// Shared server-side state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageStore {
    inner: Arc<Mutex<Store>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session acting as `user_id`.
    pub fn session(&self, user_id: UserId) -> InMemoryMessageApi {
        InMemoryMessageApi {
            user_id,
            store: self.clone(),
        }
    }

    /// Store a record as-is, assigning an id when it has none.
    pub fn insert(&self, mut message: Message) -> Message {
        let mut store = self.inner.lock();
        if message.id == 0 {
            store.next_id += 1;
            message.id = store.next_id;
        } else {
            store.next_id = store.next_id.max(message.id);
        }
        store.messages.push(message.clone());
        message
    }

    pub fn get(&self, id: MessageId) -> Option<Message> {
        self.inner.lock().messages.iter().find(|m| m.id == id).cloned()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock().messages.clone()
    }

    fn update<F>(&self, id: MessageId, f: F) -> Result<Message, MessagingError>
    where
        F: FnOnce(&mut Message),
    {
        let mut store = self.inner.lock();
        let message = store
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| MessagingError::Status {
                status: 404,
                message: format!("message {id} not found"),
            })?;
        f(message);
        message.updated_at = STORE_TIMESTAMP.to_string();
        Ok(message.clone())
    }
}

/// One user's view of an [`InMemoryMessageStore`].
#[derive(Debug, Clone)]
pub struct InMemoryMessageApi {
    user_id: UserId,
    store: InMemoryMessageStore,
}

impl InMemoryMessageApi {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn store(&self) -> &InMemoryMessageStore {
        &self.store
    }
}

#[async_trait]
impl MessageApi for InMemoryMessageApi {
    async fn send(&self, message: &NewMessage) -> Result<Message, MessagingError> {
        Ok(self.store.insert(Message {
            sender_id: self.user_id,
            recipient_id: message.recipient_id,
            content_type: message.content_type.clone(),
            size: message.content.len() as u64,
            status: "sent".to_string(),
            created_at: STORE_TIMESTAMP.to_string(),
            updated_at: STORE_TIMESTAMP.to_string(),
            encrypted_content: Some(message.content.clone()),
            ..Message::default()
        }))
    }

    async fn fetch(&self) -> Result<Vec<Message>, MessagingError> {
        Ok(self
            .store
            .messages()
            .into_iter()
            .filter(|m| m.sender_id == self.user_id || m.recipient_id == self.user_id)
            .collect())
    }

    async fn mark_as_read(&self, id: MessageId) -> Result<Message, MessagingError> {
        self.store.update(id, |m| {
            m.is_read = true;
            m.read_at = Some(STORE_TIMESTAMP.to_string());
        })
    }

    async fn revoke(&self, id: MessageId) -> Result<(), MessagingError> {
        self.store
            .update(id, |m| m.status = STATUS_REVOKED.to_string())
            .map(|_| ())
    }
}

/// Fixed user → public key table.
#[derive(Debug, Default)]
pub struct StaticKeyDirectory {
    keys: RwLock<HashMap<UserId, [u8; 32]>>,
}

impl StaticKeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, user_id: UserId, public_key: [u8; 32]) -> Self {
        self.insert(user_id, public_key);
        self
    }

    /// Publish or rotate a key.
    pub fn insert(&self, user_id: UserId, public_key: [u8; 32]) {
        self.keys.write().insert(user_id, public_key);
    }
}

#[async_trait]
impl KeyDirectory for StaticKeyDirectory {
    async fn public_key(&self, user_id: UserId) -> Result<[u8; 32], MessagingError> {
        self.keys
            .read()
            .get(&user_id)
            .copied()
            .ok_or(MessagingError::UserNotFound(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sessions_see_only_their_conversations() {
        let store = InMemoryMessageStore::new();
        let alice = store.session(1);
        let bob = store.session(2);
        let carol = store.session(3);

        let sent = alice.send(&NewMessage::text(2, "{}")).await.unwrap();
        assert_eq!(sent.id, 1);
        assert_eq!(sent.sender_id, 1);

        assert_eq!(alice.fetch().await.unwrap().len(), 1);
        assert_eq!(bob.fetch().await.unwrap().len(), 1);
        assert!(carol.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_as_read_and_revoke() {
        let store = InMemoryMessageStore::new();
        let alice = store.session(1);
        let sent = alice.send(&NewMessage::text(2, "{}")).await.unwrap();

        let read = store.session(2).mark_as_read(sent.id).await.unwrap();
        assert!(read.is_read);
        alice.revoke(sent.id).await.unwrap();
        assert!(store.get(sent.id).unwrap().is_revoked());

        assert!(matches!(
            alice.revoke(99).await,
            Err(MessagingError::Status { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_static_directory() {
        let directory = StaticKeyDirectory::new().with(2, [7; 32]);
        assert_eq!(directory.public_key(2).await.unwrap(), [7; 32]);
        assert!(matches!(
            directory.public_key(3).await,
            Err(MessagingError::UserNotFound(3))
        ));
    }
}
