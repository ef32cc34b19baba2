//! # Leaf Insertion
//!
//! One attempt = lock, stage, transition, commit. The retry loop wraps
//! attempts and only repeats on `ErrorClass::TransientStorage`.

use super::MerkleLog;
use crate::domain::entities::{KeyPrefix, LogHead, TreeState};
use crate::domain::errors::{KVStoreError, MerkleLogError, TransientStorageError};
use crate::domain::tree::IncrementalTree;
use crate::ports::inbound::LeafTransition;
use crate::ports::outbound::read_record;
use crate::transaction::LeafTransaction;
use pkd_types::{Classified, ErrorClass, LeafDraft, MerkleLeaf};
use rand::Rng;
use std::time::Duration;

impl MerkleLog {
    pub(crate) fn insert_with_retry<T: LeafTransition>(
        &self,
        draft: &LeafDraft,
        transition: &mut T,
    ) -> Result<MerkleLeaf, T::Error> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.try_insert(draft, transition) {
                Ok(leaf) => return Ok(leaf),
                Err(e) if e.class() == ErrorClass::TransientStorage && attempt < max_attempts => {
                    let backoff = self.backoff();
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "[pkd-01] transient storage error, retrying leaf insertion"
                    );
                    std::thread::sleep(backoff);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Commit writes that are not logged actions (operator configuration)
    /// inside the writer critical section.
    ///
    /// No leaf is appended. Because leaf transactions hold the same section
    /// from their first read to their commit, a row written here is never
    /// overwritten by a transaction that read it beforehand. Not retried:
    /// contention surfaces as `TransientStorageError::Locked`.
    pub fn write_unlogged<R, E, F>(&self, write: F) -> Result<R, E>
    where
        E: From<MerkleLogError>,
        F: FnOnce(&mut LeafTransaction<'_>) -> Result<R, E>,
    {
        let _guard = self
            .writer
            .try_lock_for(self.config.busy_timeout)
            .ok_or(MerkleLogError::Transient(TransientStorageError::Locked))?;

        let mut tx = LeafTransaction::begin(self.store.as_ref());
        let out = write(&mut tx)?;
        let staged = tx.staged();
        self.store
            .atomic_batch_write(tx.into_operations())
            .map_err(MerkleLogError::from)?;
        tracing::debug!(rows = staged, "[pkd-01] unlogged write committed");
        Ok(out)
    }

    fn backoff(&self) -> Duration {
        let min = self.config.backoff_min.as_millis() as u64;
        let max = (self.config.backoff_max.as_millis() as u64).max(min);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    fn try_insert<T: LeafTransition>(
        &self,
        draft: &LeafDraft,
        transition: &mut T,
    ) -> Result<MerkleLeaf, T::Error> {
        let _guard = self
            .writer
            .try_lock_for(self.config.busy_timeout)
            .ok_or(MerkleLogError::Transient(TransientStorageError::Locked))?;

        let mut tx = LeafTransaction::begin(self.store.as_ref());

        let mut state: TreeState = read_record(&tx, &KeyPrefix::tree_state_key())?.unwrap_or(
            TreeState {
                tree: Vec::new(),
                next_leaf_id: 1,
                write_challenge: None,
            },
        );
        let mut tree = if state.tree.is_empty() {
            IncrementalTree::new()
        } else {
            IncrementalTree::from_serialized(&state.tree)?
        };

        let index = tree.add_leaf(&draft.canonical_bytes());
        let id = state.next_leaf_id;
        if id != index + 1 {
            return Err(MerkleLogError::Storage(KVStoreError::CorruptionError {
                message: format!("tree holds {} leaves but next leaf id is {id}", index),
            })
            .into());
        }
        tree.update_root();
        let inclusion_proof = tree.inclusion_proof(index)?;
        let root = tree.encoded_root();

        let leaf = MerkleLeaf {
            id,
            contents: draft.contents.clone(),
            contents_hash: draft.contents_hash(),
            signature: draft.signature,
            public_key_hash: draft.public_key_hash,
            inclusion_proof,
            root,
            created: draft.created,
        };

        tx.put_record(KeyPrefix::leaf_key(id), &leaf)?;
        tx.put(KeyPrefix::root_key(&root), id.to_be_bytes().to_vec());

        transition.apply_within_leaf_transaction(&mut tx, &leaf)?;

        state.tree = tree.to_serialized()?;
        state.next_leaf_id = id + 1;
        if tx.clears_write_challenge() {
            state.write_challenge = None;
        }
        let head = LogHead {
            leaf_count: id,
            latest_root: Some(root),
        };
        tx.put_record(KeyPrefix::tree_state_key(), &state)?;
        tx.put_record(KeyPrefix::head_key(), &head)?;

        let staged = tx.staged();
        self.store
            .atomic_batch_write(tx.into_operations())
            .map_err(MerkleLogError::from)?;

        {
            let mut cache = self.cache.lock();
            cache.head = Some(head);
            cache.leaves.put(id, leaf.clone());
        }

        tracing::info!(
            leaf_id = id,
            root = %root,
            rows = staged,
            "[pkd-01] leaf committed"
        );

        Ok(leaf)
    }
}
