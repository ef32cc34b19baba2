//! # HPKE (Hybrid Public Key Encryption)
//!
//! Base-mode RFC 9180 over DHKEM(X25519, HKDF-SHA256) and HKDF-SHA256 with a
//! caller-selected AEAD. Used for messages sealed to the directory and for
//! rewrapping attribute keys to replica peers.
//!
//! ## Wire Format
//!
//! ```text
//! pkd-hpke-v1:<base64url( suite_id (u16 BE) || enc (32) || ciphertext )>
//! ```
//!
//! The prefix and suite id are bound as AAD, so a blob cannot be replayed
//! under a different suite.

use crate::{b64_decode, b64_encode, CryptoError};
use hpke::aead::{Aead, AesGcm128, AesGcm256, ChaCha20Poly1305};
use hpke::kdf::HkdfSha256;
use hpke::kem::X25519HkdfSha256;
use hpke::{Deserializable, Kem as KemTrait, OpModeR, OpModeS, Serializable};
use pkd_types::Ciphersuite;
use std::fmt;

type Kem = X25519HkdfSha256;

/// Prefix of every sealed blob.
pub const CIPHERTEXT_PREFIX: &str = "pkd-hpke-v1:";

/// HPKE `info` string.
const INFO: &[u8] = b"pkd-hpke-v1";

/// Encapsulated X25519 key length.
const ENCAPPED_LEN: usize = 32;

/// Smallest AEAD tag among the supported suites.
const TAG_LEN: usize = 16;

/// Recipient public key.
#[derive(Clone)]
pub struct HpkePublicKey(<Kem as KemTrait>::PublicKey);

impl HpkePublicKey {
    /// Parse a serialized X25519 public key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        <Kem as KemTrait>::PublicKey::from_bytes(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Serialized public key.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }
}

impl PartialEq for HpkePublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for HpkePublicKey {}

impl fmt::Debug for HpkePublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HpkePublicKey({})", b64_encode(&self.to_bytes()))
    }
}

/// Recipient secret key.
#[derive(Clone)]
pub struct HpkeSecretKey(<Kem as KemTrait>::PrivateKey);

impl HpkeSecretKey {
    /// Parse a serialized X25519 secret key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        <Kem as KemTrait>::PrivateKey::from_bytes(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPrivateKey)
    }

    /// Serialized secret key. Handle with care.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    /// Public half of this secret.
    pub fn public_key(&self) -> HpkePublicKey {
        HpkePublicKey(<Kem as KemTrait>::sk_to_pk(&self.0))
    }
}

impl fmt::Debug for HpkeSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HpkeSecretKey([redacted])")
    }
}

/// An X25519 keypair.
#[derive(Clone, Debug)]
pub struct HpkeKeyPair {
    /// Secret half.
    pub secret: HpkeSecretKey,
    /// Public half.
    pub public: HpkePublicKey,
}

impl HpkeKeyPair {
    /// Generate a random keypair.
    pub fn generate() -> Self {
        let (sk, pk) = <Kem as KemTrait>::gen_keypair(&mut rand::thread_rng());
        Self {
            secret: HpkeSecretKey(sk),
            public: HpkePublicKey(pk),
        }
    }

    /// Deterministically derive a keypair from input keying material.
    pub fn derive(ikm: &[u8]) -> Self {
        let (sk, pk) = <Kem as KemTrait>::derive_keypair(ikm);
        Self {
            secret: HpkeSecretKey(sk),
            public: HpkePublicKey(pk),
        }
    }

    /// Rebuild from a serialized secret key.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let secret = HpkeSecretKey::from_bytes(bytes)?;
        let public = secret.public_key();
        Ok(Self { secret, public })
    }
}

fn aad_for(suite: Ciphersuite) -> Vec<u8> {
    let mut aad = CIPHERTEXT_PREFIX.as_bytes().to_vec();
    aad.extend_from_slice(&suite.id().to_be_bytes());
    aad
}

fn seal_with<A: Aead>(
    recipient: &HpkePublicKey,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    let mut rng = rand::thread_rng();
    let (encapped, ciphertext) = hpke::single_shot_seal::<A, HkdfSha256, Kem, _>(
        &OpModeS::Base,
        &recipient.0,
        INFO,
        plaintext,
        aad,
        &mut rng,
    )
    .map_err(|e| CryptoError::EncryptionFailed(format!("HPKE seal: {e:?}")))?;
    Ok((encapped.to_bytes().to_vec(), ciphertext))
}

fn open_with<A: Aead>(
    secret: &HpkeSecretKey,
    encapped: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let encapped = <Kem as KemTrait>::EncappedKey::from_bytes(encapped)
        .map_err(|e| CryptoError::MalformedCiphertext(format!("encapsulated key: {e:?}")))?;
    hpke::single_shot_open::<A, HkdfSha256, Kem>(
        &OpModeR::Base,
        &secret.0,
        &encapped,
        INFO,
        ciphertext,
        aad,
    )
    .map_err(|e| CryptoError::DecryptionFailed(format!("HPKE open: {e:?}")))
}

/// Seal `plaintext` to `recipient` under `suite`.
pub fn seal(
    recipient: &HpkePublicKey,
    suite: Ciphersuite,
    plaintext: &[u8],
) -> Result<String, CryptoError> {
    let aad = aad_for(suite);
    let (encapped, ciphertext) = match suite {
        Ciphersuite::X25519Sha256Aes128Gcm => seal_with::<AesGcm128>(recipient, plaintext, &aad)?,
        Ciphersuite::X25519Sha256Aes256Gcm => seal_with::<AesGcm256>(recipient, plaintext, &aad)?,
        Ciphersuite::X25519Sha256ChaCha20Poly1305 => {
            seal_with::<ChaCha20Poly1305>(recipient, plaintext, &aad)?
        }
    };

    let mut body = Vec::with_capacity(2 + encapped.len() + ciphertext.len());
    body.extend_from_slice(&suite.id().to_be_bytes());
    body.extend_from_slice(&encapped);
    body.extend_from_slice(&ciphertext);
    Ok(format!("{}{}", CIPHERTEXT_PREFIX, b64_encode(&body)))
}

/// Split a blob into (suite, enc, ciphertext) without decrypting.
fn parse(blob: &str) -> Result<(Ciphersuite, Vec<u8>, Vec<u8>), CryptoError> {
    let payload = blob
        .strip_prefix(CIPHERTEXT_PREFIX)
        .ok_or_else(|| CryptoError::MalformedCiphertext("missing prefix".into()))?;
    let body = b64_decode(payload)?;
    if body.len() < 2 + ENCAPPED_LEN + TAG_LEN {
        return Err(CryptoError::MalformedCiphertext(format!(
            "blob too short: {} bytes",
            body.len()
        )));
    }
    let suite_id = u16::from_be_bytes([body[0], body[1]]);
    let suite =
        Ciphersuite::from_id(suite_id).ok_or(CryptoError::UnsupportedCiphersuite(suite_id))?;
    let encapped = body[2..2 + ENCAPPED_LEN].to_vec();
    let ciphertext = body[2 + ENCAPPED_LEN..].to_vec();
    Ok((suite, encapped, ciphertext))
}

/// Open a blob produced by [`seal`].
pub fn open(secret: &HpkeSecretKey, blob: &str) -> Result<Vec<u8>, CryptoError> {
    let (suite, encapped, ciphertext) = parse(blob)?;
    let aad = aad_for(suite);
    match suite {
        Ciphersuite::X25519Sha256Aes128Gcm => {
            open_with::<AesGcm128>(secret, &encapped, &ciphertext, &aad)
        }
        Ciphersuite::X25519Sha256Aes256Gcm => {
            open_with::<AesGcm256>(secret, &encapped, &ciphertext, &aad)
        }
        Ciphersuite::X25519Sha256ChaCha20Poly1305 => {
            open_with::<ChaCha20Poly1305>(secret, &encapped, &ciphertext, &aad)
        }
    }
}

/// Format sniffing: does `blob` look like a sealed message?
///
/// Checks prefix, encoding, minimum length and suite id. Says nothing about
/// whether the blob would decrypt.
pub fn is_ciphertext(blob: &str) -> bool {
    parse(blob).is_ok()
}
