//! # Shared Crypto - End-to-End Message Encryption
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `box_cipher` | X25519 + XSalsa20-Poly1305 (NaCl `box`) | Message bodies |
//! | `envelope` | base64 JSON | Wire/storage form of ciphertext |
//! | `hashing` | SHA-256 | Content integrity digests |
//! | `engine` | - | Stateless facade used by the messaging layer |
//!
//! ## Security Properties
//!
//! - **Fresh nonce per message**: 192-bit random nonce from the OS RNG on
//!   every encryption, so random collisions are negligible.
//! - **Authenticated**: Poly1305 tag binds ciphertext to both key pairs;
//!   any tampering fails decryption with `AuthenticationFailed`.
//! - **No session state**: keys are borrowed per call and never stored.
//! - **Optional forward secrecy**: `seal`/`open_sealed` use a per-message
//!   ephemeral sender key instead of the long-lived one.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod box_cipher;
pub mod engine;
pub mod envelope;
pub mod errors;
pub mod hashing;

// Re-exports
pub use box_cipher::{decrypt, encrypt, generate_key_pair, open_sealed, seal};
pub use engine::CryptoEngine;
pub use envelope::{EncryptedEnvelope, NONCE_LENGTH};
pub use errors::CryptoError;
pub use hashing::{hash, hash_bytes, verify_integrity, Digest};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
