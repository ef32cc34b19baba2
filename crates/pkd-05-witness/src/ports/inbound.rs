//! # Inbound Ports (Driving Ports)

use crate::domain::errors::WitnessError;
use pkd_types::{MerkleRoot, WitnessCosignature};

/// API the request layer and the witnessing job call.
pub trait WitnessRegistryApi {
    /// Verify and store a cosignature `origin` made over `merkle_root`.
    ///
    /// `cosignature` is the JSON wire form. Re-cosigning the same root
    /// appends another row.
    fn add_witness_cosignature(
        &self,
        origin: &str,
        merkle_root: &MerkleRoot,
        cosignature: &str,
    ) -> Result<WitnessCosignature, WitnessError>;

    /// Every stored cosignature for the leaf with `root`, by witness then
    /// arrival order.
    fn cosignatures_for_root(
        &self,
        root: &MerkleRoot,
    ) -> Result<Vec<WitnessCosignature>, WitnessError>;
}
