//! # Process Outcome

use crate::domain::action::Action;
use pkd_types::{LeafId, MerkleRoot};
use serde::{Deserialize, Serialize};

/// What an accepted action changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ActionResult {
    /// New key bound.
    #[serde(rename_all = "kebab-case")]
    KeyAdded { actor: String, key_id: String },
    /// Keys revoked (one for RevokeKey, any number otherwise).
    #[serde(rename_all = "kebab-case")]
    KeysRevoked { key_ids: Vec<String> },
    /// Identity moved.
    #[serde(rename_all = "kebab-case")]
    IdentityMoved { new_actor: String, keys: usize },
    /// Fireproof flag changed.
    #[serde(rename_all = "kebab-case")]
    FireproofChanged { actor: String, fireproof: bool },
    /// Aux data attached.
    #[serde(rename_all = "kebab-case")]
    AuxDataAdded { actor: String, aux_id: String },
    /// Aux data revoked.
    #[serde(rename_all = "kebab-case")]
    AuxDataRevoked { actor: String, aux_id: String },
    /// Peer mirror state updated.
    #[serde(rename_all = "kebab-case")]
    CheckpointRecorded { peer: String, leaf_count: u64 },
}

/// Result of `process`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProcessOutcome {
    /// Action performed.
    pub action: Action,
    /// What it changed.
    pub result: ActionResult,
    /// Root after the action's leaf.
    pub latest_root: MerkleRoot,
    /// The action's leaf.
    pub leaf_id: LeafId,
}
