//! Crypto error types.

use pkd_types::{Classified, ErrorClass};
use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Blob is not in the sealed-message format
    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// Ciphersuite id not supported
    #[error("Unsupported ciphersuite: 0x{0:04x}")]
    UnsupportedCiphersuite(u16),

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid signature format
    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Invalid input for cryptographic operation
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Classified for CryptoError {
    fn class(&self) -> ErrorClass {
        match self {
            CryptoError::SignatureVerificationFailed => ErrorClass::PolicyViolation,
            _ => ErrorClass::CryptoFailure,
        }
    }
}
