//! # Witness Errors

use pkd_01_merkle_log::MerkleLogError;
use pkd_crypto::CryptoError;
use pkd_types::{Classified, ErrorClass, MerkleRoot};
use thiserror::Error;

/// Reasons a cosignature is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WitnessError {
    /// Underlying log/storage failure.
    #[error(transparent)]
    Log(#[from] MerkleLogError),

    /// Origin is not on the witness allow-list.
    #[error("unknown witness: {origin}")]
    UnknownWitness { origin: String },

    /// Cosignature JSON did not parse.
    #[error("malformed cosignature: {reason}")]
    MalformedCosignature { reason: String },

    /// Signature does not verify under the witness key.
    #[error("cosignature from {origin} does not verify")]
    InvalidSignature { origin: String },

    /// Cosigned root differs from the one submitted.
    #[error("cosigned root {cosigned} does not match {expected}")]
    RootMismatch {
        expected: MerkleRoot,
        cosigned: MerkleRoot,
    },

    /// Witness cosigned for another directory.
    #[error("cosignature is for {cosigned}, not {expected}")]
    HostnameMismatch { expected: String, cosigned: String },

    /// No leaf has that root.
    #[error("no leaf has root {root}")]
    UnknownRoot { root: MerkleRoot },

    /// Allow-listed witness key is unusable.
    #[error("witness key for {origin}: {source}")]
    WitnessKey { origin: String, source: CryptoError },
}

impl Classified for WitnessError {
    fn class(&self) -> ErrorClass {
        match self {
            WitnessError::Log(e) => e.class(),
            WitnessError::WitnessKey { .. } => ErrorClass::StorageInvariant,
            WitnessError::MalformedCosignature { .. } => ErrorClass::CryptoFailure,
            _ => ErrorClass::PolicyViolation,
        }
    }
}
