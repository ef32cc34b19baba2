//! # Attribute Encryption
//!
//! XChaCha20-Poly1305 over individual message attributes. Each attribute has
//! its own 256-bit key; the attribute name is bound as AAD so a ciphertext
//! cannot be moved to another field.
//!
//! Wire form: `base64url(nonce (24) || ciphertext)`.

use crate::{b64_decode, b64_encode, CryptoError};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use std::collections::BTreeMap;
use zeroize::Zeroize;

const NONCE_LEN: usize = 24;

/// Per-attribute secret key (256-bit).
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct AttributeKey([u8; 32]);

impl AttributeKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, rejecting anything but 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Generate random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Parse the base64url wire form.
    pub fn from_b64(encoded: &str) -> Result<Self, CryptoError> {
        Self::from_slice(&b64_decode(encoded)?)
    }

    /// Base64url wire form.
    pub fn to_b64(&self) -> String {
        b64_encode(&self.0)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl PartialEq for AttributeKey {
    fn eq(&self, other: &Self) -> bool {
        subtle::ConstantTimeEq::ct_eq(&self.0[..], &other.0[..]).into()
    }
}

impl Eq for AttributeKey {}

impl std::fmt::Debug for AttributeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AttributeKey([redacted])")
    }
}

/// The symmetric keys a submitter supplied for one action, by attribute name.
///
/// Ordered so iteration (and therefore rewrap row order) is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributeKeyMap {
    keys: BTreeMap<String, AttributeKey>,
}

impl AttributeKeyMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `{attribute: base64url key}` pairs.
    pub fn from_encoded<'a, I>(pairs: I) -> Result<Self, CryptoError>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut keys = BTreeMap::new();
        for (name, encoded) in pairs {
            keys.insert(name.clone(), AttributeKey::from_b64(encoded)?);
        }
        Ok(Self { keys })
    }

    /// Add or replace the key for `attribute`.
    pub fn insert(&mut self, attribute: impl Into<String>, key: AttributeKey) {
        self.keys.insert(attribute.into(), key);
    }

    /// Key for `attribute`, if supplied.
    pub fn get(&self, attribute: &str) -> Option<&AttributeKey> {
        self.keys.get(attribute)
    }

    /// Iterate in attribute-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeKey)> {
        self.keys.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no attribute is encrypted.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Encrypt one attribute value.
///
/// # Errors
///
/// Returns `CryptoError::EncryptionFailed` if encryption fails.
pub fn encrypt_attribute(
    key: &AttributeKey,
    attribute: &str,
    plaintext: &[u8],
) -> Result<String, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    let mut nonce = [0u8; NONCE_LEN];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce);

    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: attribute.as_bytes(),
            },
        )
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(b64_encode(&out))
}

/// Decrypt one attribute value produced by [`encrypt_attribute`].
///
/// # Errors
///
/// `MalformedCiphertext` for a truncated blob, `DecryptionFailed` for a
/// wrong key, wrong attribute name or tampered data.
pub fn decrypt_attribute(
    key: &AttributeKey,
    attribute: &str,
    encoded: &str,
) -> Result<Vec<u8>, CryptoError> {
    let raw = b64_decode(encoded)?;
    if raw.len() < NONCE_LEN + 16 {
        return Err(CryptoError::MalformedCiphertext(format!(
            "attribute {attribute}: {} bytes",
            raw.len()
        )));
    }
    let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    cipher
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: attribute.as_bytes(),
            },
        )
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}
