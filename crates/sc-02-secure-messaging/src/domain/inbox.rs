//! Events delivered by the live inbox.

use crate::domain::message::{Message, MessageUpdate};

/// One realtime message event, decrypted where applicable.
#[derive(Debug, Clone, PartialEq)]
pub enum InboxEvent {
    /// `message/created`; check `decryption` before using the plaintext.
    Received(Message),
    /// `message/updated`; merge with [`Message::apply`].
    Updated(MessageUpdate),
}

impl InboxEvent {
    pub fn message_id(&self) -> u64 {
        match self {
            Self::Received(message) => message.id,
            Self::Updated(update) => update.id,
        }
    }
}
