//! # Action Transitions
//!
//! The side effect each verified action commits with its leaf. Runs inside
//! the Merkle Log's leaf transaction, so it re-checks the authorization it
//! was granted against the same state it writes to.

use crate::domain::errors::ProtocolError;
use crate::domain::messages::ActionMessage;
use crate::domain::outcome::ActionResult;
use pkd_01_merkle_log::{LeafTransaction, LeafTransition};
use pkd_02_trust_store::records;
use pkd_04_replication::{peers, rewrap_attribute_keys};
use pkd_crypto::AttributeKeyMap;
use pkd_types::{AuxDataRecord, KeyRecord, MerkleLeaf, PublicKey, Timestamp};

/// Why the directory believes the submitter may perform the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// Bundle signed by `public_key` on behalf of `actor`.
    ///
    /// `bootstrap` marks an AddKey self-signed by the key being added to an
    /// actor that has no trusted keys.
    ActorKey {
        actor: String,
        public_key: PublicKey,
        bootstrap: bool,
    },
    /// Bundle signed by a registered peer.
    Peer {
        hostname: String,
        public_key: PublicKey,
    },
    /// Offline revocation token for `public_key`.
    RevocationToken { public_key: PublicKey },
}

/// The transition for one verified action.
pub struct ActionTransition<'a> {
    message: &'a ActionMessage,
    authorization: &'a Authorization,
    keys: &'a AttributeKeyMap,
    now: Timestamp,
    result: Option<ActionResult>,
}

impl<'a> ActionTransition<'a> {
    /// Prepare the transition.
    pub fn new(
        message: &'a ActionMessage,
        authorization: &'a Authorization,
        keys: &'a AttributeKeyMap,
        now: Timestamp,
    ) -> Self {
        Self {
            message,
            authorization,
            keys,
            now,
            result: None,
        }
    }

    /// Result of the last successful application.
    pub fn into_result(self) -> Option<ActionResult> {
        self.result
    }

    fn recheck(&self, tx: &LeafTransaction<'_>) -> Result<(), ProtocolError> {
        match self.authorization {
            Authorization::ActorKey {
                actor,
                public_key,
                bootstrap,
            } => {
                let trusted = records::trusted_keys(tx, actor)?;
                let still_valid = if *bootstrap {
                    trusted.is_empty()
                } else {
                    trusted.iter().any(|k| &k.public_key == public_key)
                };
                if !still_valid {
                    return Err(ProtocolError::InvalidSignature {
                        actor: actor.clone(),
                    });
                }
            }
            Authorization::Peer {
                hostname,
                public_key,
            } => {
                let peer = peers::peer(tx, hostname)?;
                if peer.map(|p| p.public_key) != Some(*public_key) {
                    return Err(ProtocolError::UnknownPeer {
                        hostname: hostname.clone(),
                    });
                }
            }
            Authorization::RevocationToken { .. } => {}
        }
        Ok(())
    }

    fn apply(
        &self,
        tx: &mut LeafTransaction<'_>,
        leaf: &MerkleLeaf,
    ) -> Result<ActionResult, ProtocolError> {
        let key_ids = |revoked: Vec<KeyRecord>| ActionResult::KeysRevoked {
            key_ids: revoked.into_iter().map(|k| k.key_id).collect(),
        };

        Ok(match self.message {
            ActionMessage::AddKey { actor, public_key } => {
                let record = records::add_key(tx, actor, public_key.as_bytes(), leaf)?;
                ActionResult::KeyAdded {
                    actor: record.actor,
                    key_id: record.key_id,
                }
            }
            ActionMessage::RevokeKey { actor, public_key } => {
                let record = records::revoke_key(tx, actor, public_key.as_bytes(), leaf)?;
                key_ids(vec![record])
            }
            ActionMessage::RevokeKeyThirdParty { .. } => {
                let Authorization::RevocationToken { public_key } = self.authorization else {
                    return Err(ProtocolError::InvalidRevocationToken {
                        reason: "not authorized by a token".into(),
                    });
                };
                key_ids(records::revoke_keys_matching(tx, public_key, leaf)?)
            }
            ActionMessage::MoveIdentity {
                old_actor,
                new_actor,
            } => {
                let moved = records::move_identity(tx, old_actor, new_actor, leaf)?;
                ActionResult::IdentityMoved {
                    new_actor: new_actor.clone(),
                    keys: moved.len(),
                }
            }
            ActionMessage::BurnDown { actor, otp, .. } => {
                records::consume_second_factor(tx, actor, otp.as_deref(), self.now)?;
                key_ids(records::burn_down(tx, actor, leaf)?)
            }
            ActionMessage::Fireproof { actor } => {
                let actor = records::set_fireproof(tx, actor, true)?;
                ActionResult::FireproofChanged {
                    actor: actor.url,
                    fireproof: true,
                }
            }
            ActionMessage::UndoFireproof { actor } => {
                let actor = records::set_fireproof(tx, actor, false)?;
                ActionResult::FireproofChanged {
                    actor: actor.url,
                    fireproof: false,
                }
            }
            ActionMessage::AddAuxData {
                actor,
                aux_type,
                aux_data,
            } => {
                let record = records::add_aux_data(tx, actor, aux_type, aux_data, leaf)?;
                ActionResult::AuxDataAdded {
                    actor: record.actor,
                    aux_id: record.aux_id,
                }
            }
            ActionMessage::RevokeAuxData {
                actor,
                aux_type,
                aux_data,
            } => {
                let aux_id = AuxDataRecord::compute_id(aux_type, aux_data);
                let record = records::revoke_aux_data(tx, actor, &aux_id, leaf)?;
                ActionResult::AuxDataRevoked {
                    actor: record.actor,
                    aux_id: record.aux_id,
                }
            }
            ActionMessage::Checkpoint {
                from_directory,
                from_root,
                from_leaf_count,
            } => {
                let peer =
                    peers::record_mirrored_root(tx, from_directory, *from_root, *from_leaf_count)?;
                ActionResult::CheckpointRecorded {
                    peer: peer.hostname,
                    leaf_count: peer.mirrored_leaf_count,
                }
            }
        })
    }
}

impl LeafTransition for ActionTransition<'_> {
    type Error = ProtocolError;

    fn apply_within_leaf_transaction(
        &mut self,
        tx: &mut LeafTransaction<'_>,
        leaf: &MerkleLeaf,
    ) -> Result<(), ProtocolError> {
        self.recheck(tx)?;
        let result = self.apply(tx, leaf)?;
        rewrap_attribute_keys(tx, self.keys, leaf)?;
        tx.clear_write_challenge();
        self.result = Some(result);
        Ok(())
    }
}
