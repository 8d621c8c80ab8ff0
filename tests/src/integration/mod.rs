//! Integration flows over the in-memory transport and message store.

pub mod fixtures;

mod encrypted_delivery;
mod reconnect_flows;
