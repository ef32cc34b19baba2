//! # Core Directory Entities
//!
//! ## Clusters
//!
//! - **Log**: `LeafDraft`, `MerkleLeaf`
//! - **Trust**: `Actor`, `KeyRecord`, `AuxDataRecord`, `SecondFactor`
//! - **Federation**: `Peer`, `RewrapConfig`, `RewrappedKey`, `WitnessCosignature`

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha2::{Digest, Sha256};

use crate::merkle_root::MerkleRoot;

// =============================================================================
// CLUSTER A: THE LOG
// =============================================================================

/// A 32-byte SHA-256 hash.
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

/// Leaf primary key. Starts at 1 and increases by one per committed leaf.
pub type LeafId = u64;

/// SHA-256 of arbitrary bytes.
pub fn sha256(data: &[u8]) -> Hash {
    let digest = Sha256::digest(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&digest);
    hash
}

/// A leaf that has not been committed to the log yet.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafDraft {
    /// Committed record bytes (the signed action without its attribute keys).
    pub contents: Vec<u8>,
    /// Detached signature over the action.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
    /// SHA-256 of the public key that produced `signature`.
    pub public_key_hash: Hash,
    /// Creation time.
    pub created: Timestamp,
}

impl LeafDraft {
    /// Create a draft, hashing the signer's public key.
    pub fn new(
        contents: Vec<u8>,
        signature: Signature,
        signer: &PublicKey,
        created: Timestamp,
    ) -> Self {
        Self {
            contents,
            signature,
            public_key_hash: sha256(signer),
            created,
        }
    }

    /// SHA-256 of the contents.
    pub fn contents_hash(&self) -> Hash {
        sha256(&self.contents)
    }

    /// The byte string appended to the tree.
    ///
    /// `len(contents) (u64 BE) || contents || signature || public_key_hash`
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.contents.len() + 64 + 32);
        out.extend_from_slice(&(self.contents.len() as u64).to_be_bytes());
        out.extend_from_slice(&self.contents);
        out.extend_from_slice(&self.signature);
        out.extend_from_slice(&self.public_key_hash);
        out
    }
}

/// One accepted action record. Immutable once committed.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleLeaf {
    /// Primary key, equal to the 1-based tree position.
    pub id: LeafId,
    /// Committed record bytes.
    pub contents: Vec<u8>,
    /// SHA-256 of `contents`.
    pub contents_hash: Hash,
    /// Detached signature.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
    /// SHA-256 of the signer's public key.
    pub public_key_hash: Hash,
    /// Audit path from this leaf to `root`.
    pub inclusion_proof: Vec<Hash>,
    /// Tree root immediately after this leaf was appended.
    pub root: MerkleRoot,
    /// Creation time.
    pub created: Timestamp,
}

impl MerkleLeaf {
    /// Rebuild the draft this leaf was committed from.
    pub fn draft(&self) -> LeafDraft {
        LeafDraft {
            contents: self.contents.clone(),
            signature: self.signature,
            public_key_hash: self.public_key_hash,
            created: self.created,
        }
    }

    /// Zero-based position in the tree.
    pub fn index(&self) -> u64 {
        self.id.saturating_sub(1)
    }
}

// =============================================================================
// CLUSTER B: TRUST
// =============================================================================

/// A federated identity, keyed by canonical URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Canonical actor URL.
    pub url: String,
    /// Immune to BurnDown while set.
    pub fireproof: bool,
    /// Leaf that created this actor.
    pub created_leaf: LeafId,
    /// Leaf that moved this identity away, if any.
    pub moved_leaf: Option<LeafId>,
    /// Identity this actor was moved to, if any.
    pub moved_to: Option<String>,
}

impl Actor {
    /// Whether a MoveIdentity has superseded this actor.
    pub fn is_moved(&self) -> bool {
        self.moved_leaf.is_some()
    }

    /// Host part of the actor URL (`https://host/users/x` -> `host`).
    pub fn domain(&self) -> String {
        actor_domain(&self.url)
    }
}

/// Extract the lower-cased host from an actor URL or bare hostname.
pub fn actor_domain(url: &str) -> String {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(without_scheme);
    let host = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);
    host.trim_end_matches('.').to_ascii_lowercase()
}

/// A public key bound to an actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Random identifier handed back to the submitter.
    pub key_id: String,
    /// Owning actor URL.
    pub actor: String,
    /// Ed25519 public key.
    pub public_key: PublicKey,
    /// Currently trusted.
    pub trusted: bool,
    /// Leaf that inserted this key.
    pub insert_leaf: LeafId,
    /// Leaf that revoked this key.
    pub revoke_leaf: Option<LeafId>,
}

/// Auxiliary actor metadata with the same trust lifecycle as a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxDataRecord {
    /// Hex SHA-256 of `aux_type || 0x00 || aux_data`.
    pub aux_id: String,
    /// Owning actor URL.
    pub actor: String,
    /// Application-defined type tag.
    pub aux_type: String,
    /// Opaque payload.
    pub aux_data: String,
    /// Currently trusted.
    pub trusted: bool,
    /// Leaf that inserted this record.
    pub insert_leaf: LeafId,
    /// Leaf that revoked this record.
    pub revoke_leaf: Option<LeafId>,
}

impl AuxDataRecord {
    /// Deterministic identifier for a (type, data) pair.
    pub fn compute_id(aux_type: &str, aux_data: &str) -> String {
        let mut buf = Vec::with_capacity(aux_type.len() + aux_data.len() + 1);
        buf.extend_from_slice(aux_type.as_bytes());
        buf.push(0);
        buf.extend_from_slice(aux_data.as_bytes());
        hex::encode(sha256(&buf))
    }
}

/// Per-domain one-time-code enrollment consumed by BurnDown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondFactor {
    /// Domain (host) the secret protects.
    pub domain: String,
    /// Shared TOTP secret.
    pub secret: Vec<u8>,
    /// Highest time-step ever accepted.
    pub last_time_step: u64,
}

// =============================================================================
// CLUSTER C: FEDERATION
// =============================================================================

/// HPKE ciphersuites a peer may ask to be rewrapped under.
///
/// All suites use DHKEM(X25519, HKDF-SHA256) and HKDF-SHA256.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Ciphersuite {
    /// AES-128-GCM.
    X25519Sha256Aes128Gcm,
    /// AES-256-GCM.
    X25519Sha256Aes256Gcm,
    /// ChaCha20-Poly1305.
    #[default]
    X25519Sha256ChaCha20Poly1305,
}

impl Ciphersuite {
    /// Two-byte wire identifier (the RFC 9180 AEAD id).
    pub fn id(&self) -> u16 {
        match self {
            Ciphersuite::X25519Sha256Aes128Gcm => 0x0001,
            Ciphersuite::X25519Sha256Aes256Gcm => 0x0002,
            Ciphersuite::X25519Sha256ChaCha20Poly1305 => 0x0003,
        }
    }

    /// Inverse of [`Ciphersuite::id`].
    pub fn from_id(id: u16) -> Option<Self> {
        match id {
            0x0001 => Some(Ciphersuite::X25519Sha256Aes128Gcm),
            0x0002 => Some(Ciphersuite::X25519Sha256Aes256Gcm),
            0x0003 => Some(Ciphersuite::X25519Sha256ChaCha20Poly1305),
            _ => None,
        }
    }
}

/// Where and how to rewrap attribute keys for a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewrapConfig {
    /// Peer's serialized HPKE (X25519) public key.
    pub hpke_public_key: Vec<u8>,
    /// Suite to seal under.
    pub ciphersuite: Ciphersuite,
}

/// A federation partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Peer directory hostname.
    pub hostname: String,
    /// Ed25519 key the peer signs checkpoints with.
    pub public_key: PublicKey,
    /// Peer cosigns our roots.
    pub cosign: bool,
    /// Peer replicates our log.
    pub replicate: bool,
    /// Latest root of the peer's log we have seen.
    pub mirrored_root: Option<MerkleRoot>,
    /// Leaf count that root corresponds to.
    pub mirrored_leaf_count: u64,
    /// Rewrap settings; `None` means no rewrapped keys are ever produced.
    pub rewrap: Option<RewrapConfig>,
}

/// One attribute key sealed to one peer for one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewrappedKey {
    /// Peer hostname.
    pub peer: String,
    /// Leaf whose attribute this key decrypts.
    pub leaf_id: LeafId,
    /// Attribute name.
    pub attribute: String,
    /// HPKE ciphertext string.
    pub ciphertext: String,
}

/// A witness attestation over one of our roots.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessCosignature {
    /// Leaf whose root was cosigned.
    pub leaf_id: LeafId,
    /// Witness origin (hostname).
    pub witness: String,
    /// Cosigned root.
    pub merkle_root: MerkleRoot,
    /// Hostname the witness believes it cosigned for.
    pub hostname: String,
    /// Witness-asserted time.
    pub timestamp: Timestamp,
    /// Witness signature.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}
