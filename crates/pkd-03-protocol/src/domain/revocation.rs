//! # Revocation Tokens
//!
//! A key holder can sign, ahead of time, a statement that the key is to be
//! revoked and hand it to someone else. Anyone holding the token can later
//! submit RevokeKeyThirdParty without a live session.
//!
//! Format: `pkd-rt-v1:` + base64url(public key (32) || signature (64)),
//! where the signature covers `PAE("pkd-revocation-v1", public key)`.

use crate::domain::errors::ProtocolError;
use pkd_crypto::{b64_decode, b64_encode, pae, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

/// Token prefix.
pub const TOKEN_PREFIX: &str = "pkd-rt-v1:";

const DOMAIN: &[u8] = b"pkd-revocation-v1";

fn statement(public_key: &[u8; 32]) -> Vec<u8> {
    pae(&[DOMAIN, public_key])
}

fn invalid(reason: &str) -> ProtocolError {
    ProtocolError::InvalidRevocationToken {
        reason: reason.to_string(),
    }
}

/// Issue a token revoking `keypair`'s own public key.
pub fn issue(keypair: &Ed25519KeyPair) -> String {
    let public_key = keypair.public_key();
    let signature = keypair.sign(&statement(public_key.as_bytes()));
    let mut body = Vec::with_capacity(96);
    body.extend_from_slice(public_key.as_bytes());
    body.extend_from_slice(signature.as_bytes());
    format!("{TOKEN_PREFIX}{}", b64_encode(&body))
}

/// A token whose signature checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedToken {
    /// Key to revoke.
    pub public_key: Ed25519PublicKey,
    /// The key's own signature over the revocation statement.
    pub signature: Ed25519Signature,
}

/// Parse and verify a token.
pub fn verify(token: &str) -> Result<VerifiedToken, ProtocolError> {
    let body = token
        .strip_prefix(TOKEN_PREFIX)
        .ok_or_else(|| invalid("missing prefix"))?;
    let body = b64_decode(body).map_err(|_| invalid("not base64url"))?;
    if body.len() != 96 {
        return Err(invalid("wrong length"));
    }
    let (pk, sig) = body.split_at(32);
    let public_key = Ed25519PublicKey::from_slice(pk).map_err(|_| invalid("bad public key"))?;
    let signature = Ed25519Signature::from_slice(sig).map_err(|_| invalid("bad signature"))?;
    public_key
        .verify(&statement(public_key.as_bytes()), &signature)
        .map_err(|_| invalid("signature does not verify"))?;
    Ok(VerifiedToken {
        public_key,
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_token_verifies() {
        let keypair = Ed25519KeyPair::from_seed([5u8; 32]);
        let token = issue(&keypair);
        assert!(token.starts_with(TOKEN_PREFIX));
        assert_eq!(verify(&token).unwrap().public_key, keypair.public_key());
    }

    #[test]
    fn test_token_for_another_key_rejected() {
        let victim = Ed25519KeyPair::from_seed([5u8; 32]);
        let forger = Ed25519KeyPair::from_seed([6u8; 32]);
        let forged_sig = forger.sign(&statement(victim.public_key().as_bytes()));
        let mut body = victim.public_key().as_bytes().to_vec();
        body.extend_from_slice(forged_sig.as_bytes());
        let token = format!("{TOKEN_PREFIX}{}", b64_encode(&body));
        assert!(matches!(
            verify(&token),
            Err(ProtocolError::InvalidRevocationToken { .. })
        ));
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(verify("pkd-rt-v2:abc").is_err());
        assert!(verify("pkd-rt-v1:!!").is_err());
        assert!(verify(&format!("{TOKEN_PREFIX}{}", b64_encode(&[0u8; 10]))).is_err());
    }
}
