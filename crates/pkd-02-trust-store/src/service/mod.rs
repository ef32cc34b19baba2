//! # Trust Store Service
//!
//! Query side of the trust tables. Reads go straight to committed state in
//! the store the Merkle Log shares; the one operator write is ordered against
//! leaf transactions through the log's writer critical section.

use crate::domain::errors::TrustStoreError;
use crate::domain::keys::KeyPrefix;
use crate::ports::inbound::TrustStoreApi;
use crate::records;
use pkd_01_merkle_log::{KeyValueStore, MerkleLog};
use pkd_types::{Actor, AuxDataRecord, KeyRecord, SecondFactor};
use std::sync::Arc;
use tracing::info;

/// Trust store over the log's key/value store.
pub struct TrustStore {
    log: Arc<MerkleLog>,
}

impl TrustStore {
    /// Create over the log whose store holds the trust tables.
    pub fn new(log: Arc<MerkleLog>) -> Self {
        Self { log }
    }

    fn view(&self) -> &dyn KeyValueStore {
        self.log.store().as_ref()
    }

    fn known_actor(&self, url: &str) -> Result<Actor, TrustStoreError> {
        records::require_actor(self.view(), url)
    }
}

impl TrustStoreApi for TrustStore {
    fn actor(&self, url: &str) -> Result<Option<Actor>, TrustStoreError> {
        records::actor(self.view(), url)
    }

    fn public_keys(&self, actor: &str) -> Result<Vec<KeyRecord>, TrustStoreError> {
        self.known_actor(actor)?;
        records::trusted_keys(self.view(), actor)
    }

    fn key_history(&self, actor: &str) -> Result<Vec<KeyRecord>, TrustStoreError> {
        self.known_actor(actor)?;
        records::keys(self.view(), actor)
    }

    fn aux_data(&self, actor: &str) -> Result<Vec<AuxDataRecord>, TrustStoreError> {
        self.known_actor(actor)?;
        Ok(records::aux_data(self.view(), actor)?
            .into_iter()
            .filter(|a| a.trusted)
            .collect())
    }

    fn enroll_second_factor(&self, domain: &str, secret: &[u8]) -> Result<(), TrustStoreError> {
        let enrollment = SecondFactor {
            domain: domain.to_string(),
            secret: secret.to_vec(),
            last_time_step: 0,
        };
        self.log.write_unlogged(|tx| {
            tx.put_record(KeyPrefix::second_factor_key(domain), &enrollment)
                .map_err(TrustStoreError::from)
        })?;
        info!(domain, "[pkd-02] second factor enrolled");
        Ok(())
    }
}
