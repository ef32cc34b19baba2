//! # Incremental Hash Tree
//!
//! RFC 6962 Merkle tree over SHA-256.
//!
//! ## Hashing
//!
//! ```text
//! leaf  = H(0x00 || bytes)
//! node  = H(0x01 || left || right)
//! empty = H("")
//! ```
//!
//! Only the frontier is kept: the roots of the perfect subtrees that cover
//! the leaves, one per set bit of the tree size, largest first. Appending is
//! O(log n) and so is the persisted state. The frontier before an append is
//! exactly the audit path of the appended leaf, so the newest leaf's proof is
//! recorded as it goes in; older leaves keep the proof stored with them.

use crate::domain::errors::MerkleLogError;
use pkd_crypto::hashing::sha256_many;
use pkd_types::{sha256, Hash, MerkleRoot};
use serde::{Deserialize, Serialize};

const LEAF_PREFIX: &[u8] = &[0x00];
const NODE_PREFIX: &[u8] = &[0x01];

/// Hash of a leaf's bytes.
pub fn leaf_hash(bytes: &[u8]) -> Hash {
    sha256_many(&[LEAF_PREFIX, bytes])
}

/// Hash of an interior node.
pub fn node_hash(left: &Hash, right: &Hash) -> Hash {
    sha256_many(&[NODE_PREFIX, &left[..], &right[..]])
}

/// Root of a tree with no leaves.
pub fn empty_root() -> Hash {
    sha256(b"")
}

/// Append-only Merkle tree frontier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementalTree {
    size: u64,
    /// Perfect subtree roots, largest first.
    frontier: Vec<Hash>,
    /// Audit path of the newest leaf, leaf-side first.
    last_path: Vec<Hash>,
    root: Hash,
}

impl Default for IncrementalTree {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalTree {
    /// Empty tree.
    pub fn new() -> Self {
        Self {
            size: 0,
            frontier: Vec::new(),
            last_path: Vec::new(),
            root: empty_root(),
        }
    }

    /// Number of leaves.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Append a leaf. Returns its zero-based index.
    ///
    /// The cached root is stale until [`IncrementalTree::update_root`].
    pub fn add_leaf(&mut self, bytes: &[u8]) -> u64 {
        let index = self.size;
        self.last_path = self.frontier.iter().rev().copied().collect();

        let mut hash = leaf_hash(bytes);
        let mut carry = index;
        while carry & 1 == 1 {
            let Some(left) = self.frontier.pop() else {
                break;
            };
            hash = node_hash(&left, &hash);
            carry >>= 1;
        }
        self.frontier.push(hash);
        self.size += 1;
        index
    }

    /// Recompute and cache the root.
    pub fn update_root(&mut self) -> Hash {
        let mut peaks = self.frontier.iter().rev();
        self.root = match peaks.next() {
            None => empty_root(),
            Some(smallest) => peaks.fold(*smallest, |acc, peak| node_hash(peak, &acc)),
        };
        self.root
    }

    /// Cached root.
    pub fn root(&self) -> Hash {
        self.root
    }

    /// Cached root in `pkd-mr-v1:` form.
    pub fn encoded_root(&self) -> MerkleRoot {
        MerkleRoot::from_hash(self.root)
    }

    /// Inclusion proof for the leaf at `index` against the current tree.
    ///
    /// Only the newest leaf's path is derivable from the frontier.
    pub fn inclusion_proof(&self, index: u64) -> Result<Vec<Hash>, MerkleLogError> {
        if index >= self.size {
            return Err(MerkleLogError::IndexOutOfRange {
                index,
                size: self.size,
            });
        }
        if index + 1 != self.size {
            return Err(MerkleLogError::ProofUnavailable {
                index,
                size: self.size,
            });
        }
        Ok(self.last_path.clone())
    }

    /// Verify an inclusion proof (RFC 9162 §2.1.3.2).
    pub fn verify_inclusion(
        bytes: &[u8],
        index: u64,
        size: u64,
        proof: &[Hash],
        root: &Hash,
    ) -> bool {
        if index >= size {
            return false;
        }
        let mut fn_ = index;
        let mut sn = size - 1;
        let mut r = leaf_hash(bytes);

        for p in proof {
            if sn == 0 {
                return false;
            }
            if fn_ & 1 == 1 || fn_ == sn {
                r = node_hash(p, &r);
                if fn_ & 1 == 0 {
                    while fn_ & 1 == 0 && fn_ != 0 {
                        fn_ >>= 1;
                        sn >>= 1;
                    }
                }
            } else {
                r = node_hash(&r, p);
            }
            fn_ >>= 1;
            sn >>= 1;
        }

        sn == 0 && r == *root
    }

    /// Persistent form.
    pub fn to_serialized(&self) -> Result<Vec<u8>, MerkleLogError> {
        Ok(bincode::serialize(self)?)
    }

    /// Inverse of [`IncrementalTree::to_serialized`].
    pub fn from_serialized(bytes: &[u8]) -> Result<Self, MerkleLogError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
