//! # Protocol Errors

use crate::domain::action::Action;
use pkd_01_merkle_log::MerkleLogError;
use pkd_02_trust_store::TrustStoreError;
use pkd_04_replication::ReplicationError;
use pkd_crypto::CryptoError;
use pkd_types::{Classified, ErrorClass};
use thiserror::Error;

/// Everything that can reject a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Log/storage failure, stale root included.
    #[error(transparent)]
    Log(#[from] MerkleLogError),

    /// Trust transition refused.
    #[error(transparent)]
    Trust(#[from] TrustStoreError),

    /// Peer or rewrap failure.
    #[error(transparent)]
    Replication(#[from] ReplicationError),

    /// Decryption or key parsing failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Outer envelope is not valid JSON of the expected shape.
    #[error("invalid envelope: {reason}")]
    InvalidEnvelope { reason: String },

    /// Unknown `!pkd-context` tag.
    #[error("unknown context tag: {tag}")]
    UnknownContext { tag: String },

    /// The field the tag requires is absent, or both fields are present.
    #[error("envelope declares {tag} but carries the wrong message field")]
    MessageFieldMismatch { tag: String },

    /// Declared encryption disagrees with the payload.
    #[error("context mismatch: declared {declared}, payload is {actual}")]
    ContextMismatch {
        declared: &'static str,
        actual: &'static str,
    },

    /// Action arrived in the clear where it must be sealed.
    #[error("{action} must be encrypted on this transport")]
    EncryptionRequired { action: Action },

    /// Action arrived sealed where it must be plaintext.
    #[error("{action} must not be encrypted")]
    PlaintextRequired { action: Action },

    /// Action is never accepted from the external relay.
    #[error("{action} is not accepted over the external relay")]
    RelayForbidden { action: Action },

    /// Sealed message received but no decryption key is configured.
    #[error("no HPKE secret key configured")]
    DecryptionUnavailable,

    /// Inner bundle missing fields or badly typed.
    #[error("invalid bundle: {reason}")]
    InvalidBundle { reason: String },

    /// Outer envelope actor differs from the signing actor.
    #[error("actor mismatch: envelope {outer}, message {inner}")]
    ActorMismatch { outer: String, inner: String },

    /// No trusted key of the signing actor verifies the bundle.
    #[error("signature from {actor} does not verify")]
    InvalidSignature { actor: String },

    /// Revocation token is malformed or its signature is wrong.
    #[error("invalid revocation token: {reason}")]
    InvalidRevocationToken { reason: String },

    /// Checkpoint from a host that is not a registered peer.
    #[error("checkpoint from unregistered peer {hostname}")]
    UnknownPeer { hostname: String },

    /// BurnDown operator and target live on different hosts.
    #[error("operator {operator} may not burn down {target}")]
    CrossHostBurnDown { operator: String, target: String },
}

impl ProtocolError {
    pub(crate) fn bundle(reason: impl Into<String>) -> Self {
        ProtocolError::InvalidBundle {
            reason: reason.into(),
        }
    }
}

impl Classified for ProtocolError {
    fn class(&self) -> ErrorClass {
        match self {
            ProtocolError::Log(e) => e.class(),
            ProtocolError::Trust(e) => e.class(),
            ProtocolError::Replication(e) => e.class(),
            ProtocolError::Crypto(e) => e.class(),
            ProtocolError::DecryptionUnavailable => ErrorClass::StorageInvariant,
            _ => ErrorClass::PolicyViolation,
        }
    }
}
