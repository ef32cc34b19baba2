//! # Error Classes
//!
//! The four failure classes every subsystem error is sorted into.

use std::fmt;

/// Coarse classification of a failure.
///
/// | Class | Meaning | Retried |
/// |-------|---------|---------|
/// | `PolicyViolation` | the action is not allowed | never |
/// | `StorageInvariant` | a row that must exist does not, or a dependency is missing | never |
/// | `TransientStorage` | lock contention in the store | bounded |
/// | `CryptoFailure` | malformed ciphertext, primitive error | never |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Wrong context tag, bad signature, stale root, fireproof conflict, ...
    PolicyViolation,
    /// Missing expected row or unconfigured dependency.
    StorageInvariant,
    /// Deadlock, serialization conflict, store locked.
    TransientStorage,
    /// Cryptographic primitive failure.
    CryptoFailure,
}

impl ErrorClass {
    /// Stable identifier used in structured responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::PolicyViolation => "policy-violation",
            ErrorClass::StorageInvariant => "storage-invariant",
            ErrorClass::TransientStorage => "transient-storage",
            ErrorClass::CryptoFailure => "crypto-failure",
        }
    }

    /// Only transient storage contention is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorClass::TransientStorage)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every subsystem error type.
pub trait Classified {
    /// The class this error belongs to.
    fn class(&self) -> ErrorClass;
}
