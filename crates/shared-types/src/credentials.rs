//! # Credentials
//!
//! The credential port read by the connection manager (bearer token) and by
//! the messaging layer (key pair). Implementations are owned by the
//! authenticated session; consumers only read.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::keys::KeyPair;

/// Source of the caller's current authentication material.
///
/// Both methods are read on every use and never cached by consumers, so a
/// token rotation takes effect on the next control frame or request.
pub trait CredentialProvider: Send + Sync {
    /// Current bearer token, or `None` when logged out.
    fn token(&self) -> Option<String>;

    /// Current key pair, or `None` when no user is loaded.
    fn key_pair(&self) -> Option<Arc<KeyPair>>;
}

impl<T: CredentialProvider + ?Sized> CredentialProvider for Arc<T> {
    fn token(&self) -> Option<String> {
        (**self).token()
    }

    fn key_pair(&self) -> Option<Arc<KeyPair>> {
        (**self).key_pair()
    }
}

#[derive(Default)]
struct SessionState {
    token: Option<String>,
    key_pair: Option<Arc<KeyPair>>,
}

/// In-memory session credentials with rotation and logout.
#[derive(Default)]
pub struct SessionCredentials {
    state: RwLock<SessionState>,
}

impl SessionCredentials {
    /// Empty session (logged out).
    pub fn new() -> Self {
        Self::default()
    }

    /// Session with a token and no key pair.
    pub fn with_token(token: impl Into<String>) -> Self {
        let creds = Self::new();
        creds.set_token(token);
        creds
    }

    /// Replace the bearer token.
    pub fn set_token(&self, token: impl Into<String>) {
        self.state.write().token = Some(token.into());
    }

    /// Replace the key pair.
    pub fn set_key_pair(&self, key_pair: KeyPair) {
        self.state.write().key_pair = Some(Arc::new(key_pair));
    }

    /// Drop token and keys.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.token = None;
        state.key_pair = None;
    }
}

impl CredentialProvider for SessionCredentials {
    fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    fn key_pair(&self) -> Option<Arc<KeyPair>> {
        self.state.read().key_pair.clone()
    }
}
