//! # Inbound Ports (Driving Ports)
//!
//! The API other subsystems call on the Merkle Log.

use crate::domain::entities::LeafHashes;
use crate::domain::errors::MerkleLogError;
use crate::transaction::LeafTransaction;
use pkd_types::{Classified, LeafDraft, LeafId, MerkleLeaf, MerkleRoot};

/// A domain side effect committed atomically with one leaf.
///
/// The Merkle Log calls this inside the leaf transaction, after the leaf,
/// root index and tree state have been staged. Anything staged on `tx` is
/// committed in the same atomic batch; returning an error discards all of
/// it. The method may run more than once when a transient failure forces a
/// retry, so it must derive everything from `tx` and `leaf`.
pub trait LeafTransition {
    /// Error type of the side effect.
    type Error: From<MerkleLogError> + Classified + std::fmt::Display;

    /// Stage the side effect.
    fn apply_within_leaf_transaction(
        &mut self,
        tx: &mut LeafTransaction<'_>,
        leaf: &MerkleLeaf,
    ) -> Result<(), Self::Error>;
}

/// A transition with no side effect.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTransition;

impl LeafTransition for NoTransition {
    type Error = MerkleLogError;

    fn apply_within_leaf_transaction(
        &mut self,
        _tx: &mut LeafTransaction<'_>,
        _leaf: &MerkleLeaf,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Primary API for the Merkle Log.
pub trait MerkleLogApi {
    /// Append `draft` and apply `transition` in one atomic commit.
    ///
    /// Retries transient storage contention up to the configured bound.
    fn insert_leaf<T: LeafTransition>(
        &self,
        draft: LeafDraft,
        transition: &mut T,
    ) -> Result<MerkleLeaf, T::Error>;

    /// Root after the newest leaf; the empty-tree root for an empty log.
    fn latest_root(&self) -> Result<MerkleRoot, MerkleLogError>;

    /// Number of committed leaves.
    fn leaf_count(&self) -> Result<u64, MerkleLogError>;

    /// Leaf whose resulting root is `root`.
    fn leaf_by_root(&self, root: &MerkleRoot) -> Result<Option<MerkleLeaf>, MerkleLogError>;

    /// Leaf by id.
    fn leaf_by_id(&self, id: LeafId) -> Result<Option<MerkleLeaf>, MerkleLogError>;

    /// Leaves committed after `root`, paginated.
    ///
    /// The empty-tree root means "from the beginning".
    fn hashes_since(
        &self,
        root: &MerkleRoot,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LeafHashes>, MerkleLogError>;

    /// Reject `root` unless it is recent enough to authorize a new action.
    fn assert_recent_merkle_root(&self, root: &MerkleRoot) -> Result<(), MerkleLogError>;

    /// Store an advisory write-challenge token.
    fn set_write_challenge(&self, token: &str) -> Result<(), MerkleLogError>;

    /// Current write-challenge token.
    fn write_challenge(&self) -> Result<Option<String>, MerkleLogError>;
}
