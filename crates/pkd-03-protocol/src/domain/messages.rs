//! # Action Messages
//!
//! Typed view of a bundle's decrypted `message`, one variant per action.

use crate::domain::action::Action;
use crate::domain::errors::ProtocolError;
use pkd_crypto::Ed25519PublicKey;
use pkd_types::MerkleRoot;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ActorKey {
    actor: String,
    public_key: String,
}

#[derive(Deserialize)]
struct ActorOnly {
    actor: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Token {
    revocation_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Move {
    old_actor: String,
    new_actor: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Burn {
    actor: String,
    operator: String,
    #[serde(default)]
    otp: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Aux {
    actor: String,
    aux_type: String,
    aux_data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Check {
    from_directory: String,
    from_root: MerkleRoot,
    from_leaf_count: u64,
}

/// A decrypted, typed action message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionMessage {
    AddKey {
        actor: String,
        public_key: Ed25519PublicKey,
    },
    RevokeKey {
        actor: String,
        public_key: Ed25519PublicKey,
    },
    RevokeKeyThirdParty {
        revocation_token: String,
    },
    MoveIdentity {
        old_actor: String,
        new_actor: String,
    },
    BurnDown {
        /// Target.
        actor: String,
        operator: String,
        otp: Option<String>,
    },
    Fireproof {
        actor: String,
    },
    UndoFireproof {
        actor: String,
    },
    AddAuxData {
        actor: String,
        aux_type: String,
        aux_data: String,
    },
    RevokeAuxData {
        actor: String,
        aux_type: String,
        aux_data: String,
    },
    Checkpoint {
        /// Peer hostname.
        from_directory: String,
        from_root: MerkleRoot,
        from_leaf_count: u64,
    },
}

fn fields<T: DeserializeOwned>(
    action: Action,
    message: Map<String, Value>,
) -> Result<T, ProtocolError> {
    serde_json::from_value(Value::Object(message))
        .map_err(|e| ProtocolError::bundle(format!("{action} message: {e}")))
}

fn public_key(encoded: &str) -> Result<Ed25519PublicKey, ProtocolError> {
    Ed25519PublicKey::from_b64(encoded)
        .map_err(|e| ProtocolError::bundle(format!("public-key: {e}")))
}

impl ActionMessage {
    /// Type the message of `action`.
    pub fn parse(action: Action, message: Map<String, Value>) -> Result<Self, ProtocolError> {
        Ok(match action {
            Action::AddKey => {
                let m: ActorKey = fields(action, message)?;
                ActionMessage::AddKey {
                    public_key: public_key(&m.public_key)?,
                    actor: m.actor,
                }
            }
            Action::RevokeKey => {
                let m: ActorKey = fields(action, message)?;
                ActionMessage::RevokeKey {
                    public_key: public_key(&m.public_key)?,
                    actor: m.actor,
                }
            }
            Action::RevokeKeyThirdParty => {
                let m: Token = fields(action, message)?;
                ActionMessage::RevokeKeyThirdParty {
                    revocation_token: m.revocation_token,
                }
            }
            Action::MoveIdentity => {
                let m: Move = fields(action, message)?;
                ActionMessage::MoveIdentity {
                    old_actor: m.old_actor,
                    new_actor: m.new_actor,
                }
            }
            Action::BurnDown => {
                let m: Burn = fields(action, message)?;
                ActionMessage::BurnDown {
                    actor: m.actor,
                    operator: m.operator,
                    otp: m.otp,
                }
            }
            Action::Fireproof => {
                let m: ActorOnly = fields(action, message)?;
                ActionMessage::Fireproof { actor: m.actor }
            }
            Action::UndoFireproof => {
                let m: ActorOnly = fields(action, message)?;
                ActionMessage::UndoFireproof { actor: m.actor }
            }
            Action::AddAuxData => {
                let m: Aux = fields(action, message)?;
                ActionMessage::AddAuxData {
                    actor: m.actor,
                    aux_type: m.aux_type,
                    aux_data: m.aux_data,
                }
            }
            Action::RevokeAuxData => {
                let m: Aux = fields(action, message)?;
                ActionMessage::RevokeAuxData {
                    actor: m.actor,
                    aux_type: m.aux_type,
                    aux_data: m.aux_data,
                }
            }
            Action::Checkpoint => {
                let m: Check = fields(action, message)?;
                ActionMessage::Checkpoint {
                    from_directory: m.from_directory,
                    from_root: m.from_root,
                    from_leaf_count: m.from_leaf_count,
                }
            }
        })
    }

    /// The action this message belongs to.
    pub fn action(&self) -> Action {
        match self {
            ActionMessage::AddKey { .. } => Action::AddKey,
            ActionMessage::RevokeKey { .. } => Action::RevokeKey,
            ActionMessage::RevokeKeyThirdParty { .. } => Action::RevokeKeyThirdParty,
            ActionMessage::MoveIdentity { .. } => Action::MoveIdentity,
            ActionMessage::BurnDown { .. } => Action::BurnDown,
            ActionMessage::Fireproof { .. } => Action::Fireproof,
            ActionMessage::UndoFireproof { .. } => Action::UndoFireproof,
            ActionMessage::AddAuxData { .. } => Action::AddAuxData,
            ActionMessage::RevokeAuxData { .. } => Action::RevokeAuxData,
            ActionMessage::Checkpoint { .. } => Action::Checkpoint,
        }
    }

    /// Actor whose key must have signed the bundle. Token revocations have
    /// none.
    pub fn signing_actor(&self) -> Option<&str> {
        match self {
            ActionMessage::AddKey { actor, .. }
            | ActionMessage::RevokeKey { actor, .. }
            | ActionMessage::Fireproof { actor }
            | ActionMessage::UndoFireproof { actor }
            | ActionMessage::AddAuxData { actor, .. }
            | ActionMessage::RevokeAuxData { actor, .. } => Some(actor),
            ActionMessage::MoveIdentity { old_actor, .. } => Some(old_actor),
            ActionMessage::BurnDown { operator, .. } => Some(operator),
            ActionMessage::Checkpoint { from_directory, .. } => Some(from_directory),
            ActionMessage::RevokeKeyThirdParty { .. } => None,
        }
    }
}
