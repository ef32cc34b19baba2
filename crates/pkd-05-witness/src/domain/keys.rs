//! # Witness Table Layout
//!
//! | Prefix | Key | Value |
//! |--------|-----|-------|
//! | `c:` | leaf id (BE), 0x00, witness, 0x00, sequence (BE) | `WitnessCosignature` |

use pkd_types::LeafId;

/// Key prefix for cosignature rows.
pub const COSIGNATURE_PREFIX: &[u8] = b"c:";

/// All cosignatures of one leaf.
pub fn leaf_prefix(leaf_id: LeafId) -> Vec<u8> {
    let mut key = COSIGNATURE_PREFIX.to_vec();
    key.extend_from_slice(&leaf_id.to_be_bytes());
    key.push(0);
    key
}

/// All cosignatures of one leaf by one witness.
pub fn witness_prefix(leaf_id: LeafId, witness: &str) -> Vec<u8> {
    let mut key = leaf_prefix(leaf_id);
    key.extend_from_slice(witness.as_bytes());
    key.push(0);
    key
}

/// One cosignature row.
pub fn cosignature_key(leaf_id: LeafId, witness: &str, sequence: u32) -> Vec<u8> {
    let mut key = witness_prefix(leaf_id, witness);
    key.extend_from_slice(&sequence.to_be_bytes());
    key
}
