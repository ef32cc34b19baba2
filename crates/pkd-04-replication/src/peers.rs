//! # Peer Records
//!
//! Lookups over any [`StoreView`] plus the one peer mutation that is a
//! logged action: recording a checkpoint's mirrored root.

use crate::domain::errors::ReplicationError;
use crate::domain::keys::KeyPrefix;
use pkd_01_merkle_log::{read_record, scan_records, LeafTransaction, StoreView};
use pkd_types::{MerkleRoot, Peer};

/// Peer by hostname.
pub fn peer<V: StoreView + ?Sized>(
    view: &V,
    hostname: &str,
) -> Result<Option<Peer>, ReplicationError> {
    Ok(read_record(view, &KeyPrefix::peer_key(hostname))?)
}

/// Every registered peer, by hostname.
pub fn peers<V: StoreView + ?Sized>(view: &V) -> Result<Vec<Peer>, ReplicationError> {
    Ok(scan_records(view, KeyPrefix::Peer.as_bytes())?)
}

/// Peer by hostname, or `PeerNotFound`.
pub fn require_peer<V: StoreView + ?Sized>(
    view: &V,
    hostname: &str,
) -> Result<Peer, ReplicationError> {
    peer(view, hostname)?.ok_or_else(|| ReplicationError::PeerNotFound {
        hostname: hostname.to_string(),
    })
}

/// Record the root a peer's checkpoint asserts as its mirrored state.
pub fn record_mirrored_root(
    tx: &mut LeafTransaction<'_>,
    hostname: &str,
    root: MerkleRoot,
    leaf_count: u64,
) -> Result<Peer, ReplicationError> {
    let mut peer = require_peer(&*tx, hostname)?;
    if leaf_count < peer.mirrored_leaf_count {
        return Err(ReplicationError::MirrorRegressed {
            hostname: hostname.to_string(),
            leaf_count,
            mirrored: peer.mirrored_leaf_count,
        });
    }
    peer.mirrored_root = Some(root);
    peer.mirrored_leaf_count = leaf_count;
    tx.put_record(KeyPrefix::peer_key(hostname), &peer)?;
    tracing::info!(
        peer = hostname,
        root = %root,
        leaf_count,
        "[pkd-04] mirrored root recorded"
    );
    Ok(peer)
}
