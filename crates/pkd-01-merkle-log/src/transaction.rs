//! # Leaf Transaction
//!
//! A buffered write-set over the shared store. Reads see committed rows
//! overlaid with everything staged so far; nothing reaches the store until
//! the Merkle Log commits the whole set with one atomic batch write.

use crate::domain::errors::{KVStoreError, MerkleLogError};
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult, StoreView};
use serde::Serialize;
use std::collections::BTreeMap;

/// Uncommitted writes for one leaf insertion.
pub struct LeafTransaction<'a> {
    store: &'a dyn KeyValueStore,
    /// `None` marks a staged delete.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    clear_write_challenge: bool,
}

impl<'a> LeafTransaction<'a> {
    pub(crate) fn begin(store: &'a dyn KeyValueStore) -> Self {
        Self {
            store,
            writes: BTreeMap::new(),
            clear_write_challenge: false,
        }
    }

    /// Stage a raw put.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.writes.insert(key.into(), Some(value.into()));
    }

    /// Stage a delete.
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.writes.insert(key.into(), None);
    }

    /// Stage a bincode-encoded record.
    pub fn put_record<T: Serialize>(
        &mut self,
        key: impl Into<Vec<u8>>,
        record: &T,
    ) -> Result<(), MerkleLogError> {
        let bytes = bincode::serialize(record)?;
        self.put(key, bytes);
        Ok(())
    }

    /// Clear the advisory write-challenge token when this transaction commits.
    pub fn clear_write_challenge(&mut self) {
        self.clear_write_challenge = true;
    }

    pub(crate) fn clears_write_challenge(&self) -> bool {
        self.clear_write_challenge
    }

    /// Number of staged operations.
    pub fn staged(&self) -> usize {
        self.writes.len()
    }

    pub(crate) fn into_operations(self) -> Vec<BatchOperation> {
        self.writes
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => BatchOperation::Put { key, value },
                None => BatchOperation::Delete { key },
            })
            .collect()
    }
}

impl StoreView for LeafTransaction<'_> {
    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        match self.writes.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => self.store.get(key),
        }
    }

    fn scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.store.prefix_scan(prefix)?.into_iter().collect();
        for (key, staged) in self.writes.range(prefix.to_vec()..) {
            if !key.starts_with(prefix) {
                break;
            }
            match staged {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}
