//! # Public Key Directory Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs      # Signed-message builders shared by flows and benches
//! └── integration/     # Cross-subsystem flows
//!     ├── flows.rs         # protocol → trust, replication, witness
//!     ├── durability.rs    # restart over the file-backed store
//!     └── concurrency.rs   # many writers, one log
//!
//! tests/benches/
//! └── leaf_insertion.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p pkd-tests
//! cargo test -p pkd-tests integration::flows
//! cargo bench -p pkd-tests
//! ```

pub mod fixtures;
pub mod integration;
