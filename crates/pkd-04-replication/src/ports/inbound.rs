//! # Inbound Ports (Driving Ports)

use crate::domain::errors::ReplicationError;
use pkd_types::{LeafId, Peer, RewrapConfig, RewrappedKey};

/// Operator-facing peer registry.
///
/// These writes are configuration, not logged actions, but they take the
/// log's writer critical section like one. Mirrored state changes only
/// through Checkpoint, inside a leaf transaction
/// ([`crate::peers::record_mirrored_root`]).
pub trait PeerRegistryApi {
    /// Register a peer. Fails if the hostname is taken.
    fn add_peer(&self, peer: Peer) -> Result<(), ReplicationError>;

    /// Peer by hostname.
    fn peer(&self, hostname: &str) -> Result<Option<Peer>, ReplicationError>;

    /// Every peer, by hostname.
    fn peers(&self) -> Result<Vec<Peer>, ReplicationError>;

    /// Set or clear rewrap settings.
    fn set_rewrap_config(
        &self,
        hostname: &str,
        config: Option<RewrapConfig>,
    ) -> Result<Peer, ReplicationError>;

    /// Attribute keys sealed to `peer` for `leaf_id`, by attribute name.
    fn rewrapped_keys(
        &self,
        peer: &str,
        leaf_id: LeafId,
    ) -> Result<Vec<RewrappedKey>, ReplicationError>;
}
