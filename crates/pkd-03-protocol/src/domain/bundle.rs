//! # Signed Bundle
//!
//! The inner message every envelope carries:
//!
//! ```json
//! {
//!   "action": "AddKey",
//!   "message": { "actor": "...", "public-key": "...", "time": "..." },
//!   "recent-merkle-root": "pkd-mr-v1:...",
//!   "symmetric-keys": { "actor": "<base64url key>" },
//!   "signature": "<base64url ed25519>"
//! }
//! ```
//!
//! Attributes named in `symmetric-keys` hold attribute ciphertext. The
//! signature covers `PAE("pkd-bundle-v1", action, message JSON, root)` with
//! the message exactly as submitted, ciphertext included, so the signature
//! stays checkable from the log after the keys are gone.

use crate::domain::action::Action;
use crate::domain::errors::ProtocolError;
use pkd_crypto::{
    decrypt_attribute, encrypt_attribute, pae, AttributeKey, AttributeKeyMap, Ed25519KeyPair,
    Ed25519Signature,
};
use pkd_types::MerkleRoot;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const DOMAIN: &[u8] = b"pkd-bundle-v1";

/// Inner signed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SignedBundle {
    /// Requested action.
    pub action: Action,
    /// Action fields; encrypted ones are attribute ciphertext.
    pub message: Map<String, Value>,
    /// Root the client last saw. Absent only on token revocations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_merkle_root: Option<MerkleRoot>,
    /// Attribute keys, base64url. Never written to the log.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub symmetric_keys: BTreeMap<String, String>,
    /// Base64url Ed25519 signature; empty on token revocations.
    #[serde(default)]
    pub signature: String,
}

impl SignedBundle {
    /// Unsigned bundle.
    pub fn new(action: Action, message: Map<String, Value>, root: Option<MerkleRoot>) -> Self {
        Self {
            action,
            message,
            recent_merkle_root: root,
            symmetric_keys: BTreeMap::new(),
            signature: String::new(),
        }
    }

    /// Parse bundle JSON.
    pub fn parse(raw: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(raw).map_err(|e| ProtocolError::bundle(e.to_string()))
    }

    /// JSON wire form.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::bundle(e.to_string()))
    }

    /// Bytes the signature covers.
    pub fn signing_payload(&self) -> Result<Vec<u8>, ProtocolError> {
        // serde_json maps are key-sorted, so this is canonical
        let message = serde_json::to_string(&self.message)
            .map_err(|e| ProtocolError::bundle(e.to_string()))?;
        let root = self
            .recent_merkle_root
            .map(|r| r.encode())
            .unwrap_or_default();
        Ok(pae(&[
            DOMAIN,
            self.action.as_str().as_bytes(),
            message.as_bytes(),
            root.as_bytes(),
        ]))
    }

    /// Encrypt the string attribute `name` under `key` and record the key.
    pub fn encrypt_attribute(
        mut self,
        name: &str,
        key: &AttributeKey,
    ) -> Result<Self, ProtocolError> {
        let plaintext = self
            .message
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::bundle(format!("no string attribute {name}")))?;
        let ciphertext = encrypt_attribute(key, name, plaintext.as_bytes())?;
        self.message.insert(name.to_string(), Value::String(ciphertext));
        self.symmetric_keys.insert(name.to_string(), key.to_b64());
        Ok(self)
    }

    /// Sign with `keypair`.
    pub fn sign(mut self, keypair: &Ed25519KeyPair) -> Result<Self, ProtocolError> {
        self.signature = keypair.sign(&self.signing_payload()?).to_b64();
        Ok(self)
    }

    /// Decoded signature.
    pub fn decoded_signature(&self) -> Result<Ed25519Signature, ProtocolError> {
        Ed25519Signature::from_b64(&self.signature)
            .map_err(|_| ProtocolError::bundle("signature is not a base64url Ed25519 signature"))
    }

    /// Parsed `symmetric-keys`.
    pub fn attribute_keys(&self) -> Result<AttributeKeyMap, ProtocolError> {
        Ok(AttributeKeyMap::from_encoded(&self.symmetric_keys)?)
    }

    /// Message with every encrypted attribute replaced by its plaintext.
    pub fn decrypted_message(
        &self,
        keys: &AttributeKeyMap,
    ) -> Result<Map<String, Value>, ProtocolError> {
        let mut message = self.message.clone();
        for (name, key) in keys.iter() {
            let ciphertext = message
                .get(name)
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ProtocolError::bundle(format!("key supplied for missing attribute {name}"))
                })?;
            let plaintext = decrypt_attribute(key, name, ciphertext)?;
            let plaintext = String::from_utf8(plaintext)
                .map_err(|_| ProtocolError::bundle(format!("attribute {name} is not UTF-8")))?;
            message.insert(name.to_string(), Value::String(plaintext));
        }
        Ok(message)
    }

    /// What the log records: the bundle minus its attribute keys.
    pub fn leaf_contents(&self) -> Result<Vec<u8>, ProtocolError> {
        let public = Self {
            symmetric_keys: BTreeMap::new(),
            ..self.clone()
        };
        serde_json::to_vec(&public).map_err(|e| ProtocolError::bundle(e.to_string()))
    }
}
