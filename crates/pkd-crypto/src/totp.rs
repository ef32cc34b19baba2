//! # TOTP (RFC 6238)
//!
//! HMAC-SHA1, 30-second steps, 6 digits. Verification accepts one step of
//! clock skew either way and reports which time-step matched, so callers can
//! enforce strictly increasing steps (replay protection).

use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

type HmacSha1 = Hmac<Sha1>;

/// Step length in seconds.
pub const TIME_STEP_SECONDS: u64 = 30;

/// Code length.
pub const DIGITS: u32 = 6;

/// Accepted skew in steps on each side of "now".
const SKEW: u64 = 1;

/// A TOTP generator/verifier for one shared secret.
pub struct Totp {
    secret: Vec<u8>,
}

impl Totp {
    /// Wrap a shared secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Time-step containing `unix_seconds`.
    pub fn time_step(unix_seconds: u64) -> u64 {
        unix_seconds / TIME_STEP_SECONDS
    }

    /// Code for an explicit time-step.
    pub fn code_at_step(&self, step: u64) -> String {
        // HMAC accepts keys of any length
        let mut mac = match HmacSha1::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(&step.to_be_bytes());
        let digest = mac.finalize().into_bytes();

        let offset = (digest[digest.len() - 1] & 0x0f) as usize;
        let binary = u32::from_be_bytes([
            digest[offset] & 0x7f,
            digest[offset + 1],
            digest[offset + 2],
            digest[offset + 3],
        ]);
        format!(
            "{:0width$}",
            binary % 10u32.pow(DIGITS),
            width = DIGITS as usize
        )
    }

    /// Code for the step containing `unix_seconds`.
    pub fn code_at(&self, unix_seconds: u64) -> String {
        self.code_at_step(Self::time_step(unix_seconds))
    }

    /// Check `code` against the steps around `unix_seconds`.
    ///
    /// Returns the matched time-step, or `None`. Every candidate is compared
    /// so timing does not reveal which step matched.
    pub fn verify(&self, code: &str, unix_seconds: u64) -> Option<u64> {
        let now = Self::time_step(unix_seconds);
        let mut matched = None;
        for step in now.saturating_sub(SKEW)..=now + SKEW {
            let expected = self.code_at_step(step);
            if expected.len() == code.len()
                && bool::from(expected.as_bytes().ct_eq(code.as_bytes()))
            {
                matched = Some(step);
            }
        }
        matched
    }
}

impl Drop for Totp {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}
