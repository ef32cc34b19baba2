//! # Inbound Ports (Driving Ports)
//!
//! Committed-state queries. Mutations happen only through the functions in
//! [`crate::records`], inside a leaf transaction.

use crate::domain::errors::TrustStoreError;
use pkd_types::{Actor, AuxDataRecord, KeyRecord};

/// Read API of the trust store.
pub trait TrustStoreApi {
    /// Actor by canonical URL.
    fn actor(&self, url: &str) -> Result<Option<Actor>, TrustStoreError>;

    /// Keys currently trusted for `actor`, in key-id order.
    ///
    /// A moved actor has none; its keys live under the new actor.
    fn public_keys(&self, actor: &str) -> Result<Vec<KeyRecord>, TrustStoreError>;

    /// Every key `actor` ever held, revoked ones included.
    fn key_history(&self, actor: &str) -> Result<Vec<KeyRecord>, TrustStoreError>;

    /// Aux data currently trusted for `actor`.
    fn aux_data(&self, actor: &str) -> Result<Vec<AuxDataRecord>, TrustStoreError>;

    /// Enroll (or re-enroll) a TOTP secret for `domain`.
    ///
    /// Enrollment is an operator workflow, not a logged action. It commits
    /// inside the log's writer critical section, so it cannot land between a
    /// leaf transaction's read and its commit of the same row. Re-enrolling
    /// resets the replay high-water mark.
    fn enroll_second_factor(&self, domain: &str, secret: &[u8]) -> Result<(), TrustStoreError>;
}
