//! # Peer Store Service

use crate::domain::errors::ReplicationError;
use crate::domain::keys::KeyPrefix;
use crate::peers;
use crate::ports::inbound::PeerRegistryApi;
use crate::rewrapper;
use pkd_01_merkle_log::{KeyValueStore, LeafTransaction, MerkleLog};
use pkd_crypto::HpkePublicKey;
use pkd_types::{LeafId, Peer, RewrapConfig, RewrappedKey};
use std::sync::Arc;
use tracing::info;

/// Peer registry beside the log.
///
/// Registry writes go through [`MerkleLog::write_unlogged`], so they are
/// ordered against Checkpoint transactions that rewrite the same peer row.
pub struct PeerStore {
    log: Arc<MerkleLog>,
}

impl PeerStore {
    /// Create over the log whose store holds the peer rows.
    pub fn new(log: Arc<MerkleLog>) -> Self {
        Self { log }
    }

    fn view(&self) -> &dyn KeyValueStore {
        self.log.store().as_ref()
    }
}

fn stage(tx: &mut LeafTransaction<'_>, peer: &Peer) -> Result<(), ReplicationError> {
    tx.put_record(KeyPrefix::peer_key(&peer.hostname), peer)?;
    Ok(())
}

fn validate_rewrap(hostname: &str, config: &RewrapConfig) -> Result<(), ReplicationError> {
    HpkePublicKey::from_bytes(&config.hpke_public_key).map_err(|e| {
        ReplicationError::InvalidRewrapConfig {
            hostname: hostname.to_string(),
            reason: e.to_string(),
        }
    })?;
    Ok(())
}

impl PeerRegistryApi for PeerStore {
    fn add_peer(&self, peer: Peer) -> Result<(), ReplicationError> {
        if let Some(config) = &peer.rewrap {
            validate_rewrap(&peer.hostname, config)?;
        }
        self.log.write_unlogged(|tx| {
            if peers::peer(&*tx, &peer.hostname)?.is_some() {
                return Err(ReplicationError::DuplicatePeer {
                    hostname: peer.hostname.clone(),
                });
            }
            stage(tx, &peer)
        })?;
        info!(
            peer = %peer.hostname,
            cosign = peer.cosign,
            replicate = peer.replicate,
            rewrap = peer.rewrap.is_some(),
            "[pkd-04] peer registered"
        );
        Ok(())
    }

    fn peer(&self, hostname: &str) -> Result<Option<Peer>, ReplicationError> {
        peers::peer(self.view(), hostname)
    }

    fn peers(&self) -> Result<Vec<Peer>, ReplicationError> {
        peers::peers(self.view())
    }

    fn set_rewrap_config(
        &self,
        hostname: &str,
        config: Option<RewrapConfig>,
    ) -> Result<Peer, ReplicationError> {
        if let Some(config) = &config {
            validate_rewrap(hostname, config)?;
        }
        let peer = self.log.write_unlogged(|tx| {
            let mut peer = peers::require_peer(&*tx, hostname)?;
            peer.rewrap = config;
            stage(tx, &peer)?;
            Ok::<_, ReplicationError>(peer)
        })?;
        info!(
            peer = hostname,
            rewrap = peer.rewrap.is_some(),
            "[pkd-04] rewrap config updated"
        );
        Ok(peer)
    }

    fn rewrapped_keys(
        &self,
        peer: &str,
        leaf_id: LeafId,
    ) -> Result<Vec<RewrappedKey>, ReplicationError> {
        rewrapper::rewrapped_keys(self.view(), peer, leaf_id)
    }
}
