//! # SHA-256 Content Hashing
//!
//! Hex digests of message plaintext, carried alongside ciphertext so the
//! recipient can check the decrypted body against what the sender hashed.

use sha2::{Digest as _, Sha256};

/// SHA-256 output (256-bit).
pub type Digest = [u8; 32];

/// Length of a hex-encoded digest.
pub const HEX_DIGEST_LENGTH: usize = 64;

/// Hash raw bytes with SHA-256.
pub fn hash_bytes(data: &[u8]) -> Digest {
    Sha256::digest(data).into()
}

/// Hash a message, returning 64 lowercase hex characters.
pub fn hash(message: &str) -> String {
    hex::encode(hash_bytes(message.as_bytes()))
}

/// Check `message` against a previously computed hex digest.
///
/// The whole digest is compared (no prefix matching); hex case is ignored.
pub fn verify_integrity(message: &str, expected: &str) -> bool {
    expected.len() == HEX_DIGEST_LENGTH && hash(message).eq_ignore_ascii_case(expected)
}
