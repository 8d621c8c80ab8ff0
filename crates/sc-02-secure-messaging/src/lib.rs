//! # Secure Messaging Subsystem
//!
//! **Subsystem ID:** 2
//!
//! End-to-end encrypted messages on top of the REST API and the realtime
//! channel. The server stores and relays envelope JSON only; plaintext
//! exists in this process and nowhere else.
//!
//! ## Architecture
//!
//! - **Domain Layer:** message records, updates, decryption outcome
//! - **Ports Layer:** `MessageApi` and `KeyDirectory` (driven)
//! - **Adapters Layer:** reqwest client for `/api/v1`, in-memory store
//! - **Service Layer:** `SecureMessenger` and the live `Inbox`
//!
//! ## Message path
//!
//! | Direction | Steps |
//! |-----------|-------|
//! | send | recipient key from `KeyDirectory` → `encrypt` (or `seal`) → `MessageApi::send` |
//! | fetch | `MessageApi::fetch` → open every envelope → `Decrypted` / `Failed` |
//! | live | `message/created` → inbox worker → open → `InboxEvent::Received` |
//!
//! A record that fails authentication is returned with
//! `DecryptionStatus::Failed` and no plaintext, never dropped silently and
//! never with a guess.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{HttpMessageApi, InMemoryMessageApi, InMemoryMessageStore, StaticKeyDirectory};
pub use config::{MessagingConfig, MessagingConfigBuilder};
pub use domain::{
    DecryptFailure, DecryptionStatus, InboxEvent, Integrity, Message, MessageId, MessageUpdate,
    NewMessage, UserId,
};
pub use error::{ConfigError, MessagingError};
pub use ports::{KeyDirectory, MessageApi};
pub use service::{Inbox, SecureMessenger};
