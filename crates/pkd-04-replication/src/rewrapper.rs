//! # Rewrapper
//!
//! After a leaf is accepted, each attribute key the submitter supplied is
//! sealed to every peer that asked for rewrapping. A peer can then decrypt
//! the leaf's attributes with its own HPKE secret; no directory ever hands
//! out a shared master key.
//!
//! Rows are keyed by (peer, leaf, attribute) and overwritten on conflict,
//! so a transition that reruns after a transient failure converges on one
//! row per attribute.

use crate::domain::errors::ReplicationError;
use crate::domain::keys::KeyPrefix;
use crate::peers;
use pkd_01_merkle_log::{scan_records, LeafTransaction, StoreView};
use pkd_crypto::{hpke, AttributeKeyMap, HpkePublicKey};
use pkd_types::{LeafId, MerkleLeaf, RewrappedKey};
use tracing::debug;

/// Seal every key in `keys` to every rewrap-enabled peer, staging the rows
/// on `tx`.
///
/// Peers without a rewrap config are skipped. Returns the staged rows.
pub fn rewrap_attribute_keys(
    tx: &mut LeafTransaction<'_>,
    keys: &AttributeKeyMap,
    leaf: &MerkleLeaf,
) -> Result<Vec<RewrappedKey>, ReplicationError> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let mut staged = Vec::new();
    for peer in peers::peers(&*tx)? {
        let Some(config) = peer.rewrap.as_ref() else {
            continue;
        };
        let recipient = HpkePublicKey::from_bytes(&config.hpke_public_key)?;

        for (attribute, key) in keys.iter() {
            let ciphertext = hpke::seal(&recipient, config.ciphersuite, key.as_bytes())?;
            let row = RewrappedKey {
                peer: peer.hostname.clone(),
                leaf_id: leaf.id,
                attribute: attribute.to_string(),
                ciphertext,
            };
            tx.put_record(
                KeyPrefix::rewrapped_key(&peer.hostname, leaf.id, attribute),
                &row,
            )?;
            staged.push(row);
        }
        debug!(
            peer = %peer.hostname,
            leaf_id = leaf.id,
            attributes = keys.len(),
            "[pkd-04] attribute keys rewrapped"
        );
    }
    Ok(staged)
}

/// Rewrapped keys for `peer` and `leaf_id`, in attribute order.
pub fn rewrapped_keys<V: StoreView + ?Sized>(
    view: &V,
    peer: &str,
    leaf_id: LeafId,
) -> Result<Vec<RewrappedKey>, ReplicationError> {
    Ok(scan_records(view, &KeyPrefix::rewrapped_prefix(peer, leaf_id))?)
}
