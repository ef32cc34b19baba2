//! # Read Paths and the MerkleLogApi Implementation
//!
//! Reads are served from the per-instance cache where possible and may lag a
//! concurrent writer by one leaf.

use super::MerkleLog;
use crate::domain::cutoff::{high_volume_cutoff, low_volume_cutoff};
use crate::domain::entities::{KeyPrefix, LeafHashes, LogHead, TreeState};
use crate::domain::errors::{KVStoreError, MerkleLogError};
use crate::domain::tree::empty_root;
use crate::ports::inbound::{LeafTransition, MerkleLogApi};
use crate::ports::outbound::read_record;
use pkd_types::{LeafDraft, LeafId, MerkleLeaf, MerkleRoot};

impl MerkleLog {
    fn head(&self) -> Result<LogHead, MerkleLogError> {
        if let Some(head) = self.cache.lock().head {
            return Ok(head);
        }
        let head: LogHead = read_record(self.store.as_ref(), &KeyPrefix::head_key())?
            .unwrap_or_default();
        self.cache.lock().head = Some(head);
        Ok(head)
    }

    fn tree_state(&self) -> Result<Option<TreeState>, MerkleLogError> {
        read_record(self.store.as_ref(), &KeyPrefix::tree_state_key())
    }

    fn leaf_id_for_root(&self, root: &MerkleRoot) -> Result<Option<LeafId>, MerkleLogError> {
        match self.store.get(&KeyPrefix::root_key(root))? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    MerkleLogError::Storage(KVStoreError::CorruptionError {
                        message: format!("root index entry for {root} is {} bytes", bytes.len()),
                    })
                })?;
                Ok(Some(LeafId::from_be_bytes(raw)))
            }
            None => Ok(None),
        }
    }

    /// Drop cached reads so the next call goes to the store.
    pub fn invalidate_cache(&self) {
        let mut cache = self.cache.lock();
        cache.head = None;
        cache.leaves.clear();
    }
}

impl MerkleLogApi for MerkleLog {
    fn insert_leaf<T: LeafTransition>(
        &self,
        draft: LeafDraft,
        transition: &mut T,
    ) -> Result<MerkleLeaf, T::Error> {
        self.insert_with_retry(&draft, transition)
    }

    fn latest_root(&self) -> Result<MerkleRoot, MerkleLogError> {
        Ok(self
            .head()?
            .latest_root
            .unwrap_or_else(|| MerkleRoot::from_hash(empty_root())))
    }

    fn leaf_count(&self) -> Result<u64, MerkleLogError> {
        Ok(self.head()?.leaf_count)
    }

    fn leaf_by_root(&self, root: &MerkleRoot) -> Result<Option<MerkleLeaf>, MerkleLogError> {
        match self.leaf_id_for_root(root)? {
            Some(id) => self.leaf_by_id(id),
            None => Ok(None),
        }
    }

    fn leaf_by_id(&self, id: LeafId) -> Result<Option<MerkleLeaf>, MerkleLogError> {
        if let Some(leaf) = self.cache.lock().leaves.get(&id) {
            return Ok(Some(leaf.clone()));
        }
        tracing::debug!(leaf_id = id, "[pkd-01] leaf cache miss");
        let leaf: Option<MerkleLeaf> = read_record(self.store.as_ref(), &KeyPrefix::leaf_key(id))?;
        if let Some(leaf) = &leaf {
            self.cache.lock().leaves.put(id, leaf.clone());
        }
        Ok(leaf)
    }

    fn hashes_since(
        &self,
        root: &MerkleRoot,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LeafHashes>, MerkleLogError> {
        let after = if root.as_bytes() == &empty_root() {
            0
        } else {
            self.leaf_id_for_root(root)?
                .ok_or(MerkleLogError::RootNotFound { root: *root })?
        };
        let limit = limit.min(self.config.max_page_size) as u64;
        let count = self.leaf_count()?;
        let first = after + 1 + offset as u64;

        let mut out = Vec::new();
        for id in first..=count {
            if out.len() as u64 >= limit {
                break;
            }
            let leaf = self
                .leaf_by_id(id)?
                .ok_or(MerkleLogError::LeafNotFound { id })?;
            out.push(LeafHashes {
                id: leaf.id,
                root: leaf.root,
                contents_hash: leaf.contents_hash,
                public_key_hash: leaf.public_key_hash,
                created: leaf.created,
            });
        }
        Ok(out)
    }

    fn assert_recent_merkle_root(&self, root: &MerkleRoot) -> Result<(), MerkleLogError> {
        let leaf_count = self.leaf_count()?;

        if root.as_bytes() == &empty_root() {
            if leaf_count < self.config.empty_root_window {
                return Ok(());
            }
            return Err(MerkleLogError::EmptyRootExpired { leaf_count });
        }

        let leaf_id = self
            .leaf_id_for_root(root)?
            .ok_or(MerkleLogError::RootNotFound { root: *root })?;

        let low = low_volume_cutoff(leaf_count);
        if leaf_id >= low {
            return Ok(());
        }

        let high = high_volume_cutoff(leaf_count);
        if leaf_id >= high {
            self.observer
                .high_volume_acceptance(root, leaf_id, leaf_count, low);
            return Ok(());
        }

        Err(MerkleLogError::StaleRoot {
            root: *root,
            leaf_id,
            leaf_count,
            cutoff: low.min(high),
        })
    }

    fn set_write_challenge(&self, token: &str) -> Result<(), MerkleLogError> {
        self.write_unlogged(|tx| {
            let mut state: TreeState = read_record(&*tx, &KeyPrefix::tree_state_key())?
                .unwrap_or(TreeState {
                    tree: Vec::new(),
                    next_leaf_id: 1,
                    write_challenge: None,
                });
            state.write_challenge = Some(token.to_string());
            tx.put_record(KeyPrefix::tree_state_key(), &state)
        })?;
        tracing::debug!("[pkd-01] write challenge set");
        Ok(())
    }

    fn write_challenge(&self) -> Result<Option<String>, MerkleLogError> {
        Ok(self.tree_state()?.and_then(|state| state.write_challenge))
    }
}
