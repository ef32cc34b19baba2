use crate::ports::outbound::RecencyObserver;
use pkd_types::{LeafId, MerkleRoot};

/// Reports anomalous recency acceptances as `tracing` warnings.
#[derive(Debug, Default)]
pub struct TracingRecencyObserver;

impl RecencyObserver for TracingRecencyObserver {
    fn high_volume_acceptance(
        &self,
        root: &MerkleRoot,
        leaf_id: LeafId,
        leaf_count: u64,
        low_volume_cutoff: u64,
    ) {
        tracing::warn!(
            %root,
            leaf_id,
            leaf_count,
            low_volume_cutoff,
            "[pkd-01] root accepted by high-volume window only"
        );
    }
}
