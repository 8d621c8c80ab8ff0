//! # Shared Types Crate
//!
//! Types that cross crate boundaries in the Sealed-Chat client core.
//!
//! ## Design Principles
//!
//! - **Injected credentials**: components receive a [`CredentialProvider`]
//!   at construction and read the token or key pair at the moment they need
//!   it. Nothing reaches into ambient session state.
//! - **Borrowed key material**: [`KeyPair`] is shared behind an `Arc` and
//!   never copied into the components that use it. The secret half is
//!   zeroized on drop and redacted from `Debug`.
//! - **Single observability port**: dropped frames, handler failures,
//!   transport errors and terminal connection failures all flow to one
//!   [`Observer`].

pub mod credentials;
pub mod errors;
pub mod keys;
pub mod observer;
pub mod testing;

pub use credentials::{CredentialProvider, SessionCredentials};
pub use errors::KeyDecodeError;
pub use keys::{KeyPair, SecretBytes};
pub use observer::{NoOpObserver, Observer};
