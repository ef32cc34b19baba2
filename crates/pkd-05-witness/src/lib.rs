//! # Witness Cosign Registry (pkd-05)
//!
//! Allow-listed witnesses attest that they saw one of this directory's
//! roots. The registry checks each attestation and keeps every one it
//! accepts; witnessing is advisory and never blocks the log.
//!
//! ## Crate Structure
//!
//! - `domain/` - cosignature wire format, hostname matching, table layout, errors
//! - `ports/` - `WitnessRegistryApi`
//! - `service/` - `WitnessRegistry`

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::cosignature::Cosignature;
pub use domain::errors::WitnessError;
pub use domain::hostname::{hostnames_match, normalize_hostname};
pub use ports::inbound::WitnessRegistryApi;
pub use service::{WitnessRegistry, WitnessRegistryConfig};
