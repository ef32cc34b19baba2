//! # Actions
//!
//! The closed set of things a message can ask the directory to do.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every protocol action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Bind a new public key to an actor.
    AddKey,
    /// Revoke one of the actor's own keys.
    RevokeKey,
    /// Revoke a key with its offline revocation token.
    RevokeKeyThirdParty,
    /// Move every trusted key to a new actor URL.
    MoveIdentity,
    /// Operator revokes every key of a same-host actor.
    BurnDown,
    /// Opt out of BurnDown.
    Fireproof,
    /// Opt back in to BurnDown.
    UndoFireproof,
    /// Attach auxiliary data.
    AddAuxData,
    /// Revoke auxiliary data.
    RevokeAuxData,
    /// Peer heartbeat carrying its latest root.
    Checkpoint,
}

impl Action {
    /// All actions, in wire-name order of the protocol document.
    pub const ALL: [Action; 10] = [
        Action::AddKey,
        Action::RevokeKey,
        Action::RevokeKeyThirdParty,
        Action::MoveIdentity,
        Action::BurnDown,
        Action::Fireproof,
        Action::UndoFireproof,
        Action::AddAuxData,
        Action::RevokeAuxData,
        Action::Checkpoint,
    ];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::AddKey => "AddKey",
            Action::RevokeKey => "RevokeKey",
            Action::RevokeKeyThirdParty => "RevokeKeyThirdParty",
            Action::MoveIdentity => "MoveIdentity",
            Action::BurnDown => "BurnDown",
            Action::Fireproof => "Fireproof",
            Action::UndoFireproof => "UndoFireproof",
            Action::AddAuxData => "AddAuxData",
            Action::RevokeAuxData => "RevokeAuxData",
            Action::Checkpoint => "Checkpoint",
        }
    }

    /// BurnDown and Checkpoint travel in the clear.
    pub fn requires_plaintext(&self) -> bool {
        matches!(self, Action::BurnDown | Action::Checkpoint)
    }

    /// Whether the recency window applies. Revocation tokens are issued
    /// offline and cite no live root.
    pub fn checks_recency(&self) -> bool {
        !matches!(self, Action::RevokeKeyThirdParty)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown action: {s}"))
    }
}
