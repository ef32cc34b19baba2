//! # Cosignature Wire Format
//!
//! ```json
//! {
//!   "hostname": "pkd.example",
//!   "merkle-root": "pkd-mr-v1:...",
//!   "timestamp": 1700000000,
//!   "signature": "<base64url ed25519>"
//! }
//! ```
//!
//! The signature covers `PAE("pkd-witness-cosign-v1", hostname, root, timestamp)`.

use crate::domain::errors::WitnessError;
use pkd_crypto::{pae, Ed25519KeyPair, Ed25519Signature};
use pkd_types::{MerkleRoot, Timestamp};
use serde::{Deserialize, Serialize};

const DOMAIN: &[u8] = b"pkd-witness-cosign-v1";

/// A witness's signed statement that it saw `merkle_root` on `hostname`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Cosignature {
    /// Directory the witness believes it is cosigning for.
    pub hostname: String,
    /// Cosigned root.
    pub merkle_root: MerkleRoot,
    /// Witness clock at signing time.
    pub timestamp: Timestamp,
    /// Base64url Ed25519 signature.
    pub signature: String,
}

impl Cosignature {
    /// Bytes the witness signs.
    pub fn signing_payload(hostname: &str, root: &MerkleRoot, timestamp: Timestamp) -> Vec<u8> {
        pae(&[
            DOMAIN,
            hostname.as_bytes(),
            root.encode().as_bytes(),
            timestamp.to_string().as_bytes(),
        ])
    }

    /// Produce a cosignature. Used by witnesses and in tests.
    pub fn sign(
        keypair: &Ed25519KeyPair,
        hostname: &str,
        merkle_root: MerkleRoot,
        timestamp: Timestamp,
    ) -> Self {
        let signature = keypair.sign(&Self::signing_payload(hostname, &merkle_root, timestamp));
        Self {
            hostname: hostname.to_string(),
            merkle_root,
            timestamp,
            signature: signature.to_b64(),
        }
    }

    /// Parse the JSON wire form.
    pub fn from_json(raw: &str) -> Result<Self, WitnessError> {
        serde_json::from_str(raw).map_err(|e| WitnessError::MalformedCosignature {
            reason: e.to_string(),
        })
    }

    /// Decoded signature bytes.
    pub fn decoded_signature(&self) -> Result<Ed25519Signature, WitnessError> {
        Ed25519Signature::from_b64(&self.signature).map_err(|e| {
            WitnessError::MalformedCosignature {
                reason: e.to_string(),
            }
        })
    }
}
