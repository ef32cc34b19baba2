//! # Merkle Root Codec
//!
//! Roots travel as `pkd-mr-v1:<url-safe base64 without padding>`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::entities::Hash;

/// Version prefix of the root string format.
pub const MERKLE_ROOT_PREFIX: &str = "pkd-mr-v1:";

/// Errors from parsing a root string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerkleRootError {
    /// The string does not start with [`MERKLE_ROOT_PREFIX`].
    #[error("Merkle root is missing the pkd-mr-v1: prefix")]
    MissingPrefix,

    /// The payload is not url-safe base64.
    #[error("Merkle root is not valid base64url: {0}")]
    InvalidEncoding(String),

    /// The payload decodes to the wrong number of bytes.
    #[error("Merkle root must be 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// A tree root hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MerkleRoot(Hash);

impl MerkleRoot {
    /// Wrap a raw root hash.
    pub const fn from_hash(hash: Hash) -> Self {
        Self(hash)
    }

    /// Raw root bytes.
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Encode as `pkd-mr-v1:...`.
    pub fn encode(&self) -> String {
        format!("{}{}", MERKLE_ROOT_PREFIX, URL_SAFE_NO_PAD.encode(self.0))
    }
}

impl FromStr for MerkleRoot {
    type Err = MerkleRootError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = s
            .strip_prefix(MERKLE_ROOT_PREFIX)
            .ok_or(MerkleRootError::MissingPrefix)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| MerkleRootError::InvalidEncoding(e.to_string()))?;
        let hash: Hash = bytes
            .as_slice()
            .try_into()
            .map_err(|_| MerkleRootError::InvalidLength(bytes.len()))?;
        Ok(Self(hash))
    }
}

impl TryFrom<String> for MerkleRoot {
    type Error = MerkleRootError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MerkleRoot> for String {
    fn from(root: MerkleRoot) -> Self {
        root.encode()
    }
}

impl fmt::Display for MerkleRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for MerkleRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MerkleRoot({})", hex::encode(&self.0[..8]))
    }
}
