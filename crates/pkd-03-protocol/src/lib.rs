//! # Protocol (pkd-03)
//!
//! Turns a submitted message into a committed leaf.
//!
//! A message travels as an [`Envelope`] naming the outer actor and carrying
//! either a plaintext or an HPKE-sealed [`SignedBundle`]. The bundle names
//! the [`Action`], its message fields (some possibly encrypted under
//! per-attribute keys), the Merkle root the client last saw and an Ed25519
//! signature. Acceptance appends one leaf whose transition applies the trust
//! change, rewraps attribute keys for replica peers and clears any pending
//! write challenge, all in the leaf's transaction.
//!
//! ## Acceptance Rules
//!
//! | Rule | Description |
//! |------|-------------|
//! | Context | The declared `!pkd-context` must match what the payload is |
//! | Relay | External-relay traffic must be sealed; BurnDown never arrives that way |
//! | Plaintext | BurnDown and Checkpoint are never sealed |
//! | Recency | Every action but third-party revocation cites a recent root |
//! | Actor | Envelope actor equals the signing actor |
//! | Signature | A trusted key (or the bootstrap key, peer key, token key) verifies |
//! | Atomicity | A rejected action leaves no leaf and no record change |

pub mod domain;
pub mod ports;
pub mod service;
pub mod transition;

pub use domain::action::Action;
pub use domain::bundle::SignedBundle;
pub use domain::envelope::{Context, Envelope, Transport};
pub use domain::errors::ProtocolError;
pub use domain::messages::ActionMessage;
pub use domain::outcome::{ActionResult, ProcessOutcome};
pub use domain::policy::check_encryption_policy;
pub use domain::revocation;
pub use ports::inbound::ProtocolApi;
pub use service::ProtocolService;
