//! # Log Records
//!
//! Rows the Merkle Log persists besides the leaves themselves, plus the
//! configuration and key layout of its tables.

use pkd_types::{Hash, LeafId, MerkleRoot, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The single tree-state row. Mutated only inside the writer critical section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeState {
    /// `IncrementalTree::to_serialized` output.
    pub tree: Vec<u8>,
    /// Id the next committed leaf receives.
    pub next_leaf_id: LeafId,
    /// Advisory token set by an external writer; cleared by the next
    /// successful state-changing transaction.
    pub write_challenge: Option<String>,
}

/// Small summary row read by lock-free readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LogHead {
    /// Number of committed leaves.
    pub leaf_count: u64,
    /// Root after the newest leaf; `None` while the log is empty.
    pub latest_root: Option<MerkleRoot>,
}

/// The hash columns of one leaf, as served to replicas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafHashes {
    /// Leaf id.
    pub id: LeafId,
    /// Root after this leaf.
    pub root: MerkleRoot,
    /// SHA-256 of the leaf contents.
    pub contents_hash: Hash,
    /// SHA-256 of the signer's public key.
    pub public_key_hash: Hash,
    /// Creation time.
    pub created: Timestamp,
}

/// Merkle Log tuning.
#[derive(Debug, Clone)]
pub struct MerkleLogConfig {
    /// Attempts per insertion, counting the first.
    pub max_attempts: u32,
    /// How long a writer waits for the critical section.
    pub busy_timeout: Duration,
    /// Lower bound of the randomized retry backoff.
    pub backoff_min: Duration,
    /// Upper bound of the randomized retry backoff.
    pub backoff_max: Duration,
    /// Leaves kept in the per-instance read cache.
    pub leaf_cache_size: usize,
    /// The empty-tree root stays acceptable while the log is smaller than this.
    pub empty_root_window: u64,
    /// Page size cap for `hashes_since`.
    pub max_page_size: usize,
}

impl Default for MerkleLogConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            busy_timeout: Duration::from_secs(5),
            backoff_min: Duration::from_millis(10),
            backoff_max: Duration::from_millis(100),
            leaf_cache_size: 256,
            empty_root_window: 16,
            max_page_size: 100,
        }
    }
}

/// Key prefixes for the Merkle Log tables.
///
/// Other subsystems sharing the store use different leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    /// Leaf rows: `l:{id BE}` -> MerkleLeaf
    Leaf,
    /// Root index: `r:{root hash}` -> id BE
    RootIndex,
    /// Tree state: `s:tree` -> TreeState
    TreeState,
    /// Head summary: `s:head` -> LogHead
    Head,
}

impl KeyPrefix {
    /// Get the byte prefix for this key type.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            KeyPrefix::Leaf => b"l:",
            KeyPrefix::RootIndex => b"r:",
            KeyPrefix::TreeState => b"s:tree",
            KeyPrefix::Head => b"s:head",
        }
    }

    /// Build a full key with the given suffix.
    pub fn key(&self, suffix: &[u8]) -> Vec<u8> {
        let mut key = self.as_bytes().to_vec();
        key.extend_from_slice(suffix);
        key
    }

    /// Leaf row key. Big-endian so prefix scans return id order.
    pub fn leaf_key(id: LeafId) -> Vec<u8> {
        KeyPrefix::Leaf.key(&id.to_be_bytes())
    }

    /// Root index key.
    pub fn root_key(root: &MerkleRoot) -> Vec<u8> {
        KeyPrefix::RootIndex.key(root.as_bytes())
    }

    /// Tree state key.
    pub fn tree_state_key() -> Vec<u8> {
        KeyPrefix::TreeState.as_bytes().to_vec()
    }

    /// Head summary key.
    pub fn head_key() -> Vec<u8> {
        KeyPrefix::Head.as_bytes().to_vec()
    }
}
