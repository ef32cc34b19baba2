//! # Directory Container
//!
//! Holds every subsystem instance over one shared store.
//!
//! ## Initialization Order
//!
//! ```text
//! Store ──→ Merkle Log (pkd-01)
//!              │
//!              ├──→ Trust Store (pkd-02)
//!              ├──→ Peer Registry (pkd-04) ── seeds configured peers
//!              ├──→ Witness Registry (pkd-05)
//!              └──→ Protocol (pkd-03)
//! ```
//!
//! ## Thread Safety
//!
//! Every subsystem is `Send + Sync`; the Merkle Log serializes writers
//! internally, so the container is shared as `Arc<DirectoryContainer>`.

use crate::container::config::DirectoryConfig;
use pkd_01_merkle_log::{
    FileBackedKVStore, InMemoryKVStore, KVStoreError, KeyValueStore, MerkleLog,
    MerkleLogDependencies,
};
use pkd_02_trust_store::TrustStore;
use pkd_03_protocol::ProtocolService;
use pkd_04_replication::{PeerRegistryApi, PeerStore, ReplicationError};
use pkd_05_witness::{WitnessError, WitnessRegistry, WitnessRegistryConfig};
use pkd_crypto::{CryptoError, HpkeSecretKey};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Startup failures.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Store could not be opened.
    #[error("cannot open store: {0}")]
    Store(#[from] KVStoreError),

    /// Configured HPKE secret is not a valid X25519 key.
    #[error("invalid HPKE secret key: {0}")]
    HpkeSecret(#[from] CryptoError),

    /// Witness allow-list rejected.
    #[error(transparent)]
    Witness(#[from] WitnessError),

    /// Seeding configured peers failed.
    #[error(transparent)]
    Replication(#[from] ReplicationError),
}

/// Central container holding all subsystem instances.
pub struct DirectoryContainer {
    /// Configuration the container was built from.
    pub config: DirectoryConfig,
    /// Merkle Log (pkd-01). Shared with the protocol and witness registry.
    pub log: Arc<MerkleLog>,
    /// Trust Store queries (pkd-02).
    pub trust: TrustStore,
    /// Peer registry (pkd-04).
    pub peers: PeerStore,
    /// Witness cosign registry (pkd-05).
    pub witness: WitnessRegistry,
    /// Protocol state machine (pkd-03).
    pub protocol: ProtocolService,
}

impl DirectoryContainer {
    /// Open the store and build every subsystem.
    #[instrument(skip_all, fields(hostname = %config.hostname))]
    pub fn new(config: DirectoryConfig) -> Result<Self, ContainerError> {
        let store: Arc<dyn KeyValueStore> = match config.storage.store_path() {
            Some(path) => {
                if let Some(dir) = path.parent() {
                    std::fs::create_dir_all(dir).map_err(|e| KVStoreError::IOError {
                        message: e.to_string(),
                    })?;
                }
                Arc::new(FileBackedKVStore::open(&path)?)
            }
            None => {
                warn!("[runtime] no data directory, log is kept in memory only");
                Arc::new(InMemoryKVStore::new())
            }
        };
        Self::with_store(config, store)
    }

    /// Build every subsystem over an already-open store.
    pub fn with_store(
        config: DirectoryConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, ContainerError> {
        let log = Arc::new(MerkleLog::new(
            MerkleLogDependencies::with_store(store),
            config.merkle_log_config(),
        ));

        let trust = TrustStore::new(log.clone());

        let peers = PeerStore::new(log.clone());
        for peer in &config.replication.peers {
            if peers.peer(&peer.hostname)?.is_none() {
                peers.add_peer(peer.clone())?;
            }
        }

        let witness = WitnessRegistry::new(
            log.clone(),
            WitnessRegistryConfig {
                hostname: config.hostname.clone(),
                witnesses: config.security.witnesses.clone(),
            },
        )?;

        let hpke_secret = config
            .security
            .hpke_secret_key
            .map(|bytes| HpkeSecretKey::from_bytes(&bytes))
            .transpose()?;
        let protocol = ProtocolService::new(log.clone(), hpke_secret);

        info!(
            peers = config.replication.peers.len(),
            witnesses = config.security.witnesses.len(),
            sealed = config.security.hpke_secret_key.is_some(),
            "[runtime] directory container ready"
        );

        Ok(Self {
            config,
            log,
            trust,
            peers,
            witness,
            protocol,
        })
    }
}
