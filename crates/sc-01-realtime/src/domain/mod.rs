//! # Domain Layer
//!
//! Pure connection logic: state, backoff policy, lifecycle state machine
//! and frame encoding. No async, no I/O.

pub mod frames;
pub mod lifecycle;
pub mod policy;
pub mod state;

pub use frames::{ChannelEvent, Command, ControlFrame, InboundFrame, Notice};
pub use lifecycle::{CloseOutcome, ConnectionLifecycle};
pub use policy::ReconnectPolicy;
pub use state::{ConnectionState, LifecycleEvent};
