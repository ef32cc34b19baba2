//! # Trust Store (pkd-02)
//!
//! Actors, their keys and aux data, each row citing the leaf that created or
//! revoked it.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Provenance | Each key and aux row names its insert leaf, and revoke leaf once revoked |
//! | 2 | One-way trust | A row goes trusted to untrusted at most once |
//! | 3 | Creation | Only AddKey and MoveIdentity create actors |
//! | 4 | Moved is final | A moved actor accepts no further actions |
//!
//! ## Crate Structure
//!
//! - `domain/` - table layout and errors
//! - `records` - lookups over any `StoreView`, mutations inside a `LeafTransaction`
//! - `ports/` - `TrustStoreApi`
//! - `service/` - `TrustStore`, the committed-state query side

pub mod domain;
pub mod ports;
pub mod records;
pub mod service;

pub use domain::errors::TrustStoreError;
pub use domain::keys::KeyPrefix;
pub use ports::inbound::TrustStoreApi;
pub use service::TrustStore;
