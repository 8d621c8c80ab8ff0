//! # Public-Key Authenticated Encryption
//!
//! NaCl `box` construction: X25519 key agreement, XSalsa20 stream cipher,
//! Poly1305 tag. Both directions of a conversation derive the same shared
//! key, so a sender can decrypt its own outgoing messages by swapping the
//! key roles.
//!
//! ## Usage
//!
//! ```
//! use shared_crypto::{decrypt, encrypt, generate_key_pair};
//!
//! let (alice_pk, alice_sk) = generate_key_pair();
//! let (bob_pk, bob_sk) = generate_key_pair();
//!
//! let envelope = encrypt("hello", &bob_pk, &alice_sk).unwrap();
//! assert_eq!(decrypt(&envelope, &alice_pk, &bob_sk).unwrap(), "hello");
//! ```

use crypto_box::{
    aead::{generic_array::GenericArray, Aead, AeadCore},
    PublicKey, SalsaBox, SecretKey,
};
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::envelope::{EncryptedEnvelope, NONCE_LENGTH};
use crate::CryptoError;

const KEY_LENGTH: usize = 32;

/// Generate a fresh X25519 key pair as raw bytes `(public, secret)`.
pub fn generate_key_pair() -> ([u8; KEY_LENGTH], [u8; KEY_LENGTH]) {
    let secret = SecretKey::generate(&mut OsRng);
    (*secret.public_key().as_bytes(), secret.to_bytes())
}

/// Encrypt `plaintext` for `recipient_public_key` under the sender's long-lived key.
///
/// # Errors
///
/// `InvalidKey` if either key is not 32 bytes or the public key is all zeros.
pub fn encrypt(
    plaintext: &str,
    recipient_public_key: &[u8],
    sender_secret_key: &[u8],
) -> Result<EncryptedEnvelope, CryptoError> {
    let public = parse_public_key(recipient_public_key)?;
    let secret = parse_secret_key(sender_secret_key)?;
    let (ciphertext, nonce) = seal_with(&SalsaBox::new(&public, &secret), plaintext)?;

    Ok(EncryptedEnvelope {
        ciphertext,
        nonce,
        ephemeral_public_key: None,
    })
}

/// Decrypt an envelope produced by [`encrypt`].
///
/// `counterparty_public_key` is the other side of the conversation: the
/// sender when reading an inbound message, the recipient when re-reading
/// one's own outgoing message. Any ephemeral key on the envelope is ignored.
///
/// # Errors
///
/// `AuthenticationFailed` on wrong keys or any modification of ciphertext
/// or nonce; `InvalidPlaintext` if the authenticated bytes are not UTF-8.
pub fn decrypt(
    envelope: &EncryptedEnvelope,
    counterparty_public_key: &[u8],
    own_secret_key: &[u8],
) -> Result<String, CryptoError> {
    let public = parse_public_key(counterparty_public_key)?;
    let secret = parse_secret_key(own_secret_key)?;
    open_with(&SalsaBox::new(&public, &secret), envelope)
}

/// Encrypt under a one-time sender key so compromise of long-lived keys
/// does not expose this message.
///
/// The sender cannot decrypt a sealed envelope afterwards.
pub fn seal(plaintext: &str, recipient_public_key: &[u8]) -> Result<EncryptedEnvelope, CryptoError> {
    let public = parse_public_key(recipient_public_key)?;
    let ephemeral = SecretKey::generate(&mut OsRng);
    let ephemeral_public = *ephemeral.public_key().as_bytes();
    let (ciphertext, nonce) = seal_with(&SalsaBox::new(&public, &ephemeral), plaintext)?;

    Ok(EncryptedEnvelope {
        ciphertext,
        nonce,
        ephemeral_public_key: Some(ephemeral_public),
    })
}

/// Decrypt an envelope produced by [`seal`].
///
/// # Errors
///
/// `MissingEphemeralKey` if the envelope was not sealed.
pub fn open_sealed(envelope: &EncryptedEnvelope, own_secret_key: &[u8]) -> Result<String, CryptoError> {
    let ephemeral = envelope
        .ephemeral_public_key
        .ok_or(CryptoError::MissingEphemeralKey)?;
    let public = parse_public_key(&ephemeral)?;
    let secret = parse_secret_key(own_secret_key)?;
    open_with(&SalsaBox::new(&public, &secret), envelope)
}

fn seal_with(
    salsa_box: &SalsaBox,
    plaintext: &str,
) -> Result<(Vec<u8>, [u8; NONCE_LENGTH]), CryptoError> {
    let nonce = SalsaBox::generate_nonce(&mut OsRng);
    let ciphertext = salsa_box
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut nonce_bytes = [0u8; NONCE_LENGTH];
    nonce_bytes.copy_from_slice(&nonce);
    Ok((ciphertext, nonce_bytes))
}

fn open_with(salsa_box: &SalsaBox, envelope: &EncryptedEnvelope) -> Result<String, CryptoError> {
    let nonce = GenericArray::from_slice(&envelope.nonce);
    let plaintext = salsa_box
        .decrypt(nonce, envelope.ciphertext.as_slice())
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    String::from_utf8(plaintext).map_err(|e| {
        let mut bytes = e.into_bytes();
        bytes.zeroize();
        CryptoError::InvalidPlaintext
    })
}

fn parse_public_key(bytes: &[u8]) -> Result<PublicKey, CryptoError> {
    let key: [u8; KEY_LENGTH] = bytes.try_into().map_err(|_| CryptoError::InvalidKey {
        role: "public",
        reason: format!("expected {KEY_LENGTH} bytes, got {}", bytes.len()),
    })?;
    if key.iter().all(|b| *b == 0) {
        return Err(CryptoError::InvalidKey {
            role: "public",
            reason: "all-zero key".into(),
        });
    }
    Ok(PublicKey::from(key))
}

fn parse_secret_key(bytes: &[u8]) -> Result<SecretKey, CryptoError> {
    let mut key: [u8; KEY_LENGTH] = bytes.try_into().map_err(|_| CryptoError::InvalidKey {
        role: "secret",
        reason: format!("expected {KEY_LENGTH} bytes, got {}", bytes.len()),
    })?;
    let secret = SecretKey::from(key);
    key.zeroize();
    Ok(secret)
}
