//! # Outbound Ports (Driven Ports)
//!
//! Dependencies required by the Merkle Log and every subsystem that shares
//! its store.

use crate::domain::errors::{KVStoreError, MerkleLogError};
use pkd_types::{LeafId, MerkleRoot, Timestamp};
use serde::de::DeserializeOwned;

/// Ordered key/value pairs returned by a prefix scan.
pub type ScanResult = Vec<(Vec<u8>, Vec<u8>)>;

/// Abstract interface for key-value database operations.
///
/// Methods take `&self`; adapters synchronize internally so one store can be
/// shared behind an `Arc` by every subsystem.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;

    /// Put a single key-value pair.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError>;

    /// Delete a key.
    fn delete(&self, key: &[u8]) -> Result<(), KVStoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch succeed, or NONE are applied.
    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError>;

    /// All pairs whose key starts with `prefix`, in key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }

    /// Key this operation touches.
    pub fn key(&self) -> &[u8] {
        match self {
            BatchOperation::Put { key, .. } | BatchOperation::Delete { key } => key,
        }
    }
}

/// Read-only access to stored rows.
///
/// Implemented by every [`KeyValueStore`] (committed state) and by
/// [`crate::LeafTransaction`] (committed state plus the uncommitted write-set),
/// so record lookups are written once and work in both places.
pub trait StoreView {
    /// Value for `key`.
    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;

    /// Pairs under `prefix`, in key order.
    fn scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError>;
}

impl<T: KeyValueStore + ?Sized> StoreView for T {
    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.get(key)
    }

    fn scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
        self.prefix_scan(prefix)
    }
}

/// Decode the bincode row at `key`, if present.
pub fn read_record<T, V>(view: &V, key: &[u8]) -> Result<Option<T>, MerkleLogError>
where
    T: DeserializeOwned,
    V: StoreView + ?Sized,
{
    match view.read(key)? {
        Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
        None => Ok(None),
    }
}

/// Decode every bincode row under `prefix`, in key order.
pub fn scan_records<T, V>(view: &V, prefix: &[u8]) -> Result<Vec<T>, MerkleLogError>
where
    T: DeserializeOwned,
    V: StoreView + ?Sized,
{
    view.scan(prefix)?
        .into_iter()
        .map(|(_, bytes)| bincode::deserialize(&bytes).map_err(MerkleLogError::from))
        .collect()
}

/// Abstract interface for time operations (for testability).
pub trait TimeSource: Send + Sync {
    /// Get current timestamp in seconds since epoch.
    fn now(&self) -> Timestamp;
}

/// Policy hook for roots accepted only by the high-volume window.
///
/// Such roots are old enough to be unusual but not old enough to reject.
pub trait RecencyObserver: Send + Sync {
    /// Called once per anomalous acceptance.
    fn high_volume_acceptance(
        &self,
        root: &MerkleRoot,
        leaf_id: LeafId,
        leaf_count: u64,
        low_volume_cutoff: u64,
    );
}
