//! # Sealed-Chat Test Suite
//!
//! Cross-crate flows that no single crate can test on its own.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # criterion benchmarks (crypto, dispatch, frames)
//! └── src/integration/
//!     ├── fixtures.rs           # shared harness
//!     ├── reconnect_flows.rs    # client + in-memory server + observers
//!     └── encrypted_delivery.rs # messenger + realtime inbox end to end
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sc-tests
//! cargo test -p sc-tests integration::encrypted_delivery::
//! cargo bench -p sc-tests
//! ```

pub mod integration;
