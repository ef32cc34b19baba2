//! # PKD Crypto - Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `signatures` | Ed25519 | Action signatures, revocation tokens, cosignatures |
//! | `hpke` | DHKEM(X25519) + HKDF-SHA256 + AEAD | Sealed messages, peer rewrapping |
//! | `symmetric` | XChaCha20-Poly1305 | Per-attribute encryption |
//! | `hashing` | SHA-256, PAE | Domain-separated signing payloads |
//! | `totp` | RFC 6238 (HMAC-SHA1) | BurnDown second factor |
//!
//! ## Security Properties
//!
//! - **Ed25519**: Deterministic nonces, no RNG dependency
//! - **HPKE**: Fresh ephemeral key per seal, base mode only
//! - **XChaCha20**: 192-bit random nonce, attribute name bound as AAD

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod hpke;
pub mod signatures;
pub mod symmetric;
pub mod totp;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{pae, Sha256Hasher};
pub use hpke::{is_ciphertext, open, seal, HpkeKeyPair, HpkePublicKey, HpkeSecretKey};
pub use signatures::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use symmetric::{decrypt_attribute, encrypt_attribute, AttributeKey, AttributeKeyMap};
pub use totp::Totp;

/// Base64url without padding, used for every binary field on the wire.
pub fn b64_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}

/// Inverse of [`b64_encode`]. Trailing `=` padding is tolerated.
pub fn b64_decode(data: &str) -> Result<Vec<u8>, CryptoError> {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(data.trim_end_matches('='))
        .map_err(|e| CryptoError::InvalidInput(format!("base64url: {e}")))
}
