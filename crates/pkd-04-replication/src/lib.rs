//! # Replication (pkd-04)
//!
//! The peer registry and the rewrap step that lets independent replicas
//! decrypt attribute-encrypted leaves without sharing a master key.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Opt-in | A peer without a rewrap config never receives rewrapped keys |
//! | 2 | Upsert | One row per (peer, leaf, attribute) |
//! | 3 | Atomic | Rewrapped keys commit with the leaf they belong to |
//!
//! ## Crate Structure
//!
//! - `domain/` - table layout and errors
//! - `peers` - peer lookups, checkpoint bookkeeping
//! - `rewrapper` - the in-transaction rewrap pass
//! - `ports/` - `PeerRegistryApi`
//! - `service/` - `PeerStore`

pub mod domain;
pub mod peers;
pub mod ports;
pub mod rewrapper;
pub mod service;

pub use domain::errors::ReplicationError;
pub use domain::keys::KeyPrefix;
pub use ports::inbound::PeerRegistryApi;
pub use rewrapper::{rewrap_attribute_keys, rewrapped_keys};
pub use service::PeerStore;
