//! # Domain Layer
//!
//! Message records as the API returns them, the locally attached decryption
//! outcome, and the events the inbox emits.

pub mod inbox;
pub mod message;

pub use inbox::InboxEvent;
pub use message::{
    DecryptFailure, DecryptionStatus, Integrity, Message, MessageId, MessageUpdate, NewMessage,
    UserId, STATUS_REVOKED,
};
