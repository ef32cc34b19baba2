//! # Merkle Log (pkd-01)
//!
//! The append-only transparency log every directory action is recorded in.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Append-only | Leaves are never deleted, reordered or deduplicated |
//! | 2 | Single writer | All tree mutation happens inside one critical section |
//! | 3 | Atomic leaves | Leaf + tree state + side effect commit in one batch |
//! | 4 | Dense ids | Leaf id = tree position + 1 |
//! | 5 | Bounded retry | Only transient contention is retried, at most `max_attempts` times |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - cutoffs, hash tree, records, errors
//! - `ports/` - `MerkleLogApi` and `LeafTransition` in, storage/time/observer out
//! - `adapters/` - in-memory and file-backed stores, clocks, default observer
//! - `transaction.rs` - the buffered write-set handed to transitions
//! - `service/` - `MerkleLog`
//!
//! ## Usage
//!
//! ```ignore
//! use pkd_01_merkle_log::{MerkleLog, MerkleLogApi, NoTransition};
//!
//! let log = MerkleLog::in_memory();
//! let leaf = log.insert_leaf(draft, &mut NoTransition)?;
//! log.assert_recent_merkle_root(&leaf.root)?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;
pub mod transaction;

pub use adapters::{
    FileBackedKVStore, InMemoryKVStore, ManualTimeSource, SystemTimeSource, TracingRecencyObserver,
};
pub use domain::cutoff::{high_volume_cutoff, low_volume_cutoff};
pub use domain::entities::{KeyPrefix, LeafHashes, LogHead, MerkleLogConfig, TreeState};
pub use domain::errors::{KVStoreError, MerkleLogError, TransientStorageError};
pub use domain::tree::{empty_root, IncrementalTree};
pub use ports::inbound::{LeafTransition, MerkleLogApi, NoTransition};
pub use ports::outbound::{
    read_record, scan_records, BatchOperation, KeyValueStore, RecencyObserver, ScanResult,
    StoreView, TimeSource,
};
pub use service::{MerkleLog, MerkleLogDependencies};
pub use transaction::LeafTransaction;
