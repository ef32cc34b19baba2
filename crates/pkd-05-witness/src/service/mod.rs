//! # Witness Registry Service

use crate::domain::cosignature::Cosignature;
use crate::domain::errors::WitnessError;
use crate::domain::hostname::{hostnames_match, normalize_hostname};
use crate::domain::keys;
use crate::ports::inbound::WitnessRegistryApi;
use parking_lot::Mutex;
use pkd_01_merkle_log::{scan_records, MerkleLog, MerkleLogApi, MerkleLogError};
use pkd_crypto::Ed25519PublicKey;
use pkd_types::{LeafId, MerkleRoot, PublicKey, WitnessCosignature};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Witness registry settings.
#[derive(Debug, Clone, Default)]
pub struct WitnessRegistryConfig {
    /// This directory's hostname, as witnesses should name it.
    pub hostname: String,
    /// Allow-listed witnesses: origin hostname to Ed25519 key.
    pub witnesses: BTreeMap<String, PublicKey>,
}

/// Verifies cosignatures and stores them beside the log.
pub struct WitnessRegistry {
    log: Arc<MerkleLog>,
    hostname: String,
    witnesses: BTreeMap<String, Ed25519PublicKey>,
    /// Serializes sequence assignment.
    append: Mutex<()>,
}

impl WitnessRegistry {
    /// Build over `log`, rejecting unusable witness keys up front.
    pub fn new(log: Arc<MerkleLog>, config: WitnessRegistryConfig) -> Result<Self, WitnessError> {
        let witnesses = config
            .witnesses
            .into_iter()
            .map(|(origin, key)| {
                Ed25519PublicKey::from_bytes(key)
                    .map(|key| (normalize_hostname(&origin), key))
                    .map_err(|source| WitnessError::WitnessKey { origin, source })
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(Self {
            log,
            hostname: config.hostname,
            witnesses,
            append: Mutex::new(()),
        })
    }

    /// Allow-listed origins.
    pub fn witnesses(&self) -> impl Iterator<Item = &str> {
        self.witnesses.keys().map(String::as_str)
    }

    fn leaf_for_root(&self, root: &MerkleRoot) -> Result<LeafId, WitnessError> {
        self.log
            .leaf_by_root(root)?
            .map(|leaf| leaf.id)
            .ok_or(WitnessError::UnknownRoot { root: *root })
    }

    fn append(&self, record: &WitnessCosignature) -> Result<u32, WitnessError> {
        let store = self.log.store();
        let _guard = self.append.lock();
        let prefix = keys::witness_prefix(record.leaf_id, &record.witness);
        let sequence = store.prefix_scan(&prefix).map_err(MerkleLogError::from)?.len() as u32;
        let bytes = bincode::serialize(record).map_err(MerkleLogError::from)?;
        store
            .put(
                &keys::cosignature_key(record.leaf_id, &record.witness, sequence),
                &bytes,
            )
            .map_err(MerkleLogError::from)?;
        Ok(sequence)
    }
}

impl WitnessRegistryApi for WitnessRegistry {
    fn add_witness_cosignature(
        &self,
        origin: &str,
        merkle_root: &MerkleRoot,
        cosignature: &str,
    ) -> Result<WitnessCosignature, WitnessError> {
        let witness = normalize_hostname(origin);
        let Some(key) = self.witnesses.get(&witness) else {
            warn!(origin, "[pkd-05] cosignature from unknown witness");
            return Err(WitnessError::UnknownWitness {
                origin: origin.to_string(),
            });
        };

        let cosig = Cosignature::from_json(cosignature)?;
        let signature = cosig.decoded_signature()?;
        let payload =
            Cosignature::signing_payload(&cosig.hostname, &cosig.merkle_root, cosig.timestamp);
        key.verify(&payload, &signature)
            .map_err(|_| WitnessError::InvalidSignature {
                origin: witness.clone(),
            })?;

        if cosig.merkle_root != *merkle_root {
            return Err(WitnessError::RootMismatch {
                expected: *merkle_root,
                cosigned: cosig.merkle_root,
            });
        }
        if !hostnames_match(&self.hostname, &cosig.hostname) {
            return Err(WitnessError::HostnameMismatch {
                expected: self.hostname.clone(),
                cosigned: cosig.hostname,
            });
        }

        let record = WitnessCosignature {
            leaf_id: self.leaf_for_root(merkle_root)?,
            witness,
            merkle_root: *merkle_root,
            hostname: cosig.hostname,
            timestamp: cosig.timestamp,
            signature: *signature.as_bytes(),
        };
        let sequence = self.append(&record)?;
        info!(
            witness = %record.witness,
            leaf_id = record.leaf_id,
            sequence,
            "[pkd-05] cosignature stored"
        );
        Ok(record)
    }

    fn cosignatures_for_root(
        &self,
        root: &MerkleRoot,
    ) -> Result<Vec<WitnessCosignature>, WitnessError> {
        let leaf_id = self.leaf_for_root(root)?;
        Ok(scan_records(
            self.log.store().as_ref(),
            &keys::leaf_prefix(leaf_id),
        )?)
    }
}
