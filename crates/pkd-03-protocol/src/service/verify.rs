//! Signature checks run before a leaf is drafted.

use crate::domain::bundle::SignedBundle;
use crate::domain::errors::ProtocolError;
use crate::domain::messages::ActionMessage;
use crate::domain::revocation;
use crate::transition::Authorization;
use pkd_01_merkle_log::StoreView;
use pkd_02_trust_store::records;
use pkd_04_replication::peers;
use pkd_crypto::{Ed25519PublicKey, Ed25519Signature};
use pkd_types::{PublicKey, Signature};
use tracing::debug;

/// Authorization plus the signer columns of the leaf.
pub(crate) struct Authorized {
    pub authorization: Authorization,
    pub signer: PublicKey,
    pub signature: Signature,
}

fn verifies(public_key: &PublicKey, payload: &[u8], signature: &Ed25519Signature) -> bool {
    Ed25519PublicKey::from_bytes(*public_key)
        .and_then(|pk| pk.verify(payload, signature))
        .is_ok()
}

/// Work out who signed `bundle` and whether they may perform `message`.
pub(crate) fn authorize<V: StoreView + ?Sized>(
    view: &V,
    bundle: &SignedBundle,
    message: &ActionMessage,
) -> Result<Authorized, ProtocolError> {
    match message {
        ActionMessage::RevokeKeyThirdParty { revocation_token } => {
            let token = revocation::verify(revocation_token)?;
            Ok(Authorized {
                authorization: Authorization::RevocationToken {
                    public_key: *token.public_key.as_bytes(),
                },
                signer: *token.public_key.as_bytes(),
                signature: *token.signature.as_bytes(),
            })
        }
        ActionMessage::Checkpoint { from_directory, .. } => {
            let peer = peers::peer(view, from_directory)?.ok_or_else(|| {
                ProtocolError::UnknownPeer {
                    hostname: from_directory.clone(),
                }
            })?;
            let signature = bundle.decoded_signature()?;
            if !verifies(&peer.public_key, &bundle.signing_payload()?, &signature) {
                return Err(ProtocolError::InvalidSignature {
                    actor: from_directory.clone(),
                });
            }
            Ok(Authorized {
                authorization: Authorization::Peer {
                    hostname: peer.hostname,
                    public_key: peer.public_key,
                },
                signer: peer.public_key,
                signature: *signature.as_bytes(),
            })
        }
        _ => authorize_actor(view, bundle, message),
    }
}

fn authorize_actor<V: StoreView + ?Sized>(
    view: &V,
    bundle: &SignedBundle,
    message: &ActionMessage,
) -> Result<Authorized, ProtocolError> {
    let actor = message
        .signing_actor()
        .ok_or_else(|| ProtocolError::bundle("message names no signing actor"))?;
    let signature = bundle.decoded_signature()?;
    let payload = bundle.signing_payload()?;

    let trusted = match message {
        ActionMessage::AddKey { .. } => records::trusted_keys(view, actor)?,
        _ => {
            records::require_active_actor(view, actor)?;
            records::trusted_keys(view, actor)?
        }
    };

    if trusted.is_empty() {
        if let ActionMessage::AddKey { public_key, .. } = message {
            if public_key.verify(&payload, &signature).is_ok() {
                debug!(actor, "[pkd-03] bootstrap AddKey");
                return Ok(Authorized {
                    authorization: Authorization::ActorKey {
                        actor: actor.to_string(),
                        public_key: *public_key.as_bytes(),
                        bootstrap: true,
                    },
                    signer: *public_key.as_bytes(),
                    signature: *signature.as_bytes(),
                });
            }
        }
    }

    // key-id order, first match wins
    let signer = trusted
        .iter()
        .find(|k| verifies(&k.public_key, &payload, &signature))
        .map(|k| k.public_key)
        .ok_or_else(|| ProtocolError::InvalidSignature {
            actor: actor.to_string(),
        })?;

    Ok(Authorized {
        authorization: Authorization::ActorKey {
            actor: actor.to_string(),
            public_key: signer,
            bootstrap: false,
        },
        signer,
        signature: *signature.as_bytes(),
    })
}
