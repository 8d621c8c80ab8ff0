//! # Shared Bus - Subscription Registry
//!
//! Many logical subscriptions multiplexed onto one physical connection.
//!
//! ```text
//!   subscribe(channel, action, handler)
//!              │
//!              ▼
//!   ┌──────────────────────┐  distinct_channels()  ┌──────────────┐
//!   │ SubscriptionRegistry │ ────────────────────▶ │ replay on    │
//!   │  id → (ch, act, h)   │                       │ (re)connect  │
//!   └──────────────────────┘                       └──────────────┘
//!              │ snapshot(ch, act)
//!              ▼
//!   ┌──────────────────────┐
//!   │    DispatchBatch     │ ── deliver(payload) ──▶ h1, h2, ... (isolated)
//!   └──────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - **Registration order**: handlers for one (channel, action) run in the
//!   order they were added.
//! - **Isolation**: a failing or panicking handler never prevents the
//!   remaining handlers from running.
//! - **Snapshot dispatch**: handlers may add or remove registrations while
//!   being dispatched; changes apply to the next frame.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod dispatch;
pub mod handler;
pub mod registry;

pub use dispatch::{DispatchBatch, DispatchReport};
pub use handler::{handler_fn, EventHandler, HandlerError};
pub use registry::{SubscriptionId, SubscriptionRegistry};
