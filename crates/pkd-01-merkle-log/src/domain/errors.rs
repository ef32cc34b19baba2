//! # Domain Errors
//!
//! Error types for the Merkle Log subsystem.
//!
//! Storage adapters report contention through [`TransientStorageError`];
//! that variant is the only thing the retry loop looks at.

use pkd_types::{Classified, ErrorClass, LeafId, MerkleRoot, MerkleRootError};
use thiserror::Error;

/// Contention the storage layer expects to clear on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransientStorageError {
    /// Two writers waited on each other.
    #[error("deadlock detected")]
    Deadlock,
    /// A concurrent transaction invalidated this one.
    #[error("serialization conflict")]
    SerializationConflict,
    /// The critical section could not be entered within the busy timeout.
    #[error("store is locked")]
    Locked,
}

/// Key-value store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },
    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },
    /// Another process holds the store's lock file.
    #[error("KV store already in use ({path}, pid {pid:?})")]
    AlreadyLocked { path: String, pid: Option<u32> },
    /// Retryable contention.
    #[error("KV store contention: {0}")]
    Transient(TransientStorageError),
}

impl From<TransientStorageError> for KVStoreError {
    fn from(err: TransientStorageError) -> Self {
        KVStoreError::Transient(err)
    }
}

/// Errors that can occur in the Merkle Log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerkleLogError {
    /// Retryable contention.
    #[error("transient storage error: {0}")]
    Transient(TransientStorageError),

    /// Non-retryable storage failure.
    #[error("storage error: {0}")]
    Storage(KVStoreError),

    /// Record could not be encoded or decoded.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Leaf row expected but absent.
    #[error("leaf {id} not found")]
    LeafNotFound { id: LeafId },

    /// Root does not name any committed leaf.
    #[error("merkle root {root} is not in the log")]
    RootNotFound { root: MerkleRoot },

    /// Inclusion proof requested beyond the tree size.
    #[error("leaf index {index} out of range for tree of size {size}")]
    IndexOutOfRange { index: u64, size: u64 },

    /// Only the newest leaf's path can be rebuilt from the tree frontier.
    #[error("no inclusion proof for leaf index {index} in tree of size {size}")]
    ProofUnavailable { index: u64, size: u64 },

    /// Submitted root string did not parse.
    #[error("invalid merkle root: {0}")]
    InvalidRoot(#[from] MerkleRootError),

    /// Cited root is older than every recency window allows.
    #[error("merkle root {root} (leaf {leaf_id}) is stale: {leaf_count} leaves, cutoff {cutoff}")]
    StaleRoot {
        root: MerkleRoot,
        leaf_id: LeafId,
        leaf_count: u64,
        cutoff: u64,
    },

    /// The empty-tree root was cited after the log outgrew it.
    #[error("empty-tree root is no longer recent ({leaf_count} leaves)")]
    EmptyRootExpired { leaf_count: u64 },
}

impl From<KVStoreError> for MerkleLogError {
    fn from(err: KVStoreError) -> Self {
        match err {
            KVStoreError::Transient(t) => MerkleLogError::Transient(t),
            other => MerkleLogError::Storage(other),
        }
    }
}

impl From<TransientStorageError> for MerkleLogError {
    fn from(err: TransientStorageError) -> Self {
        MerkleLogError::Transient(err)
    }
}

impl From<bincode::Error> for MerkleLogError {
    fn from(err: bincode::Error) -> Self {
        MerkleLogError::Serialization {
            message: err.to_string(),
        }
    }
}

impl Classified for MerkleLogError {
    fn class(&self) -> ErrorClass {
        match self {
            MerkleLogError::Transient(_) => ErrorClass::TransientStorage,
            MerkleLogError::Storage(_)
            | MerkleLogError::Serialization { .. }
            | MerkleLogError::LeafNotFound { .. }
            | MerkleLogError::IndexOutOfRange { .. }
            | MerkleLogError::ProofUnavailable { .. } => ErrorClass::StorageInvariant,
            MerkleLogError::RootNotFound { .. }
            | MerkleLogError::InvalidRoot(_)
            | MerkleLogError::StaleRoot { .. }
            | MerkleLogError::EmptyRootExpired { .. } => ErrorClass::PolicyViolation,
        }
    }
}
