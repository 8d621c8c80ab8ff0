//! # Service Layer
//!
//! [`SecureMessenger`] encrypts before anything reaches a port and decrypts
//! everything that comes back; [`Inbox`] feeds it realtime events.

pub mod inbox;
pub mod messenger;

pub use inbox::{Inbox, ACTION_CREATED, ACTION_UPDATED, MESSAGE_CHANNEL};
pub use messenger::SecureMessenger;
