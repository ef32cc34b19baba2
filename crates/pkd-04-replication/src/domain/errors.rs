//! # Replication Errors

use pkd_01_merkle_log::MerkleLogError;
use pkd_crypto::CryptoError;
use pkd_types::{Classified, ErrorClass};
use thiserror::Error;

/// Errors raised by the peer registry and the rewrapper.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicationError {
    /// Underlying log/storage failure.
    #[error(transparent)]
    Log(#[from] MerkleLogError),

    /// Sealing to a peer failed.
    #[error("rewrap failed: {0}")]
    Crypto(#[from] CryptoError),

    /// Hostname not registered.
    #[error("peer not found: {hostname}")]
    PeerNotFound { hostname: String },

    /// Hostname registered twice.
    #[error("peer already registered: {hostname}")]
    DuplicatePeer { hostname: String },

    /// Checkpoint asserts fewer leaves than already mirrored.
    #[error("checkpoint for {hostname} goes backwards: {leaf_count} < {mirrored}")]
    MirrorRegressed {
        hostname: String,
        leaf_count: u64,
        mirrored: u64,
    },

    /// Rewrap settings unusable.
    #[error("invalid rewrap config for {hostname}: {reason}")]
    InvalidRewrapConfig { hostname: String, reason: String },
}

impl Classified for ReplicationError {
    fn class(&self) -> ErrorClass {
        match self {
            ReplicationError::Log(e) => e.class(),
            ReplicationError::Crypto(_) => ErrorClass::CryptoFailure,
            ReplicationError::PeerNotFound { .. } => ErrorClass::StorageInvariant,
            ReplicationError::DuplicatePeer { .. }
            | ReplicationError::MirrorRegressed { .. }
            | ReplicationError::InvalidRewrapConfig { .. } => ErrorClass::PolicyViolation,
        }
    }
}
