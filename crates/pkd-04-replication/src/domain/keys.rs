//! # Replication Table Layout
//!
//! | Prefix | Key | Value |
//! |--------|-----|-------|
//! | `p:` | hostname | `Peer` |
//! | `w:` | hostname, 0x00, leaf id (BE), 0x00, attribute | `RewrappedKey` |
//!
//! Big-endian leaf ids keep one peer's rewrapped keys in leaf order.

use pkd_types::LeafId;

/// Key prefixes for the replication tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    /// Peer rows.
    Peer,
    /// Rewrapped key rows.
    RewrappedKey,
}

impl KeyPrefix {
    /// Get the byte prefix for this key type.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            KeyPrefix::Peer => b"p:",
            KeyPrefix::RewrappedKey => b"w:",
        }
    }

    /// Peer row.
    pub fn peer_key(hostname: &str) -> Vec<u8> {
        let mut key = KeyPrefix::Peer.as_bytes().to_vec();
        key.extend_from_slice(hostname.as_bytes());
        key
    }

    /// All rewrapped keys for one peer and leaf.
    pub fn rewrapped_prefix(peer: &str, leaf_id: LeafId) -> Vec<u8> {
        let mut key = KeyPrefix::RewrappedKey.as_bytes().to_vec();
        key.extend_from_slice(peer.as_bytes());
        key.push(0);
        key.extend_from_slice(&leaf_id.to_be_bytes());
        key.push(0);
        key
    }

    /// One rewrapped key row.
    pub fn rewrapped_key(peer: &str, leaf_id: LeafId, attribute: &str) -> Vec<u8> {
        let mut key = Self::rewrapped_prefix(peer, leaf_id);
        key.extend_from_slice(attribute.as_bytes());
        key
    }
}
