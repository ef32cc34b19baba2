//! # PKD Types Crate
//!
//! Records shared by every subsystem of the Public Key Directory.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: leaves, actors, key records and peers are
//!   defined once here and persisted by the subsystem that owns them.
//! - **Provenance**: every trust transition on a record cites the leaf that
//!   caused it (`insert_leaf`, `revoke_leaf`, `moved_leaf`).
//! - **Error classes**: each subsystem error maps onto one [`ErrorClass`],
//!   which is what retry policy and response mapping look at.

pub mod entities;
pub mod errors;
pub mod merkle_root;

pub use entities::*;
pub use errors::{Classified, ErrorClass};
pub use merkle_root::{MerkleRoot, MerkleRootError, MERKLE_ROOT_PREFIX};
