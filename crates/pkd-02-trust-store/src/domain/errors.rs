//! # Trust Store Errors

use pkd_01_merkle_log::MerkleLogError;
use pkd_types::{Classified, ErrorClass};
use thiserror::Error;

/// Errors raised by trust transitions and record lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrustStoreError {
    /// Underlying log/storage failure.
    #[error(transparent)]
    Log(#[from] MerkleLogError),

    /// Action names an actor the directory has never seen.
    #[error("actor not found: {actor}")]
    ActorNotFound { actor: String },

    /// Actor was moved away by MoveIdentity and accepts no further actions.
    #[error("actor {actor} has moved to {moved_to}")]
    ActorMoved { actor: String, moved_to: String },

    /// No trusted key with that public key.
    #[error("no trusted key for {actor} matches")]
    KeyNotFound { actor: String },

    /// The key exists but was already revoked.
    #[error("key {key_id} is already revoked")]
    KeyAlreadyRevoked { key_id: String },

    /// The key is already trusted for this actor.
    #[error("key is already trusted for {actor}")]
    DuplicateKey { actor: String },

    /// Revocation token subject matches no trusted key anywhere.
    #[error("no trusted key matches the revocation token")]
    NoMatchingKey,

    /// No aux data with that id.
    #[error("aux data {aux_id} not found for {actor}")]
    AuxDataNotFound { actor: String, aux_id: String },

    /// Aux data already revoked.
    #[error("aux data {aux_id} is already revoked")]
    AuxDataAlreadyRevoked { aux_id: String },

    /// Aux data already trusted for this actor.
    #[error("aux data {aux_id} is already trusted for {actor}")]
    DuplicateAuxData { actor: String, aux_id: String },

    /// MoveIdentity target already holds keys.
    #[error("move target {actor} already holds keys")]
    MoveTargetHasKeys { actor: String },

    /// MoveIdentity to itself.
    #[error("cannot move {actor} onto itself")]
    MoveToSelf { actor: String },

    /// BurnDown against an actor that opted out of it.
    #[error("fireproof conflict: {actor} is fireproof")]
    FireproofConflict { actor: String },

    /// Fireproof requested twice.
    #[error("{actor} is already fireproof")]
    AlreadyFireproof { actor: String },

    /// UndoFireproof on an actor that is not fireproof.
    #[error("{actor} is not fireproof")]
    NotFireproof { actor: String },

    /// One-time code missing or wrong.
    #[error("second factor for {domain} is invalid")]
    SecondFactorInvalid { domain: String },

    /// One-time code from a time-step already consumed.
    #[error("second factor for {domain} reused: step {step} <= last accepted {last}")]
    SecondFactorReused { domain: String, step: u64, last: u64 },
}

impl Classified for TrustStoreError {
    fn class(&self) -> ErrorClass {
        match self {
            TrustStoreError::Log(e) => e.class(),
            _ => ErrorClass::PolicyViolation,
        }
    }
}
