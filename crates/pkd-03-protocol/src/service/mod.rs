//! # Protocol Service
//!
//! One call per submitted message:
//!
//! 1. parse the envelope and select the field its tag names
//! 2. open it if sealed
//! 3. parse the bundle, apply the encryption policy
//! 4. check the cited root is recent (token revocations excepted)
//! 5. decrypt attributes and type the message
//! 6. match the envelope actor to the signing actor
//! 7. verify the signature
//! 8. append the leaf with the action's transition

mod verify;
#[cfg(test)]
mod tests;

use crate::domain::bundle::SignedBundle;
use crate::domain::envelope::{Envelope, Payload, Transport};
use crate::domain::errors::ProtocolError;
use crate::domain::messages::ActionMessage;
use crate::domain::outcome::ProcessOutcome;
use crate::domain::policy::check_encryption_policy;
use crate::ports::inbound::ProtocolApi;
use crate::transition::ActionTransition;
use pkd_01_merkle_log::{MerkleLog, MerkleLogApi};
use pkd_crypto::{open, HpkeSecretKey};
use pkd_types::{actor_domain, Classified, LeafDraft};
use std::sync::Arc;
use tracing::{info, warn};

/// The protocol state machine.
pub struct ProtocolService {
    log: Arc<MerkleLog>,
    hpke_secret: Option<HpkeSecretKey>,
}

impl ProtocolService {
    /// Create over `log`. Without an HPKE secret, sealed messages are
    /// refused.
    pub fn new(log: Arc<MerkleLog>, hpke_secret: Option<HpkeSecretKey>) -> Self {
        Self { log, hpke_secret }
    }

    /// The log actions are appended to.
    pub fn log(&self) -> &Arc<MerkleLog> {
        &self.log
    }

    fn open_payload(&self, payload: Payload<'_>) -> Result<(Vec<u8>, bool), ProtocolError> {
        match payload {
            Payload::Plain(body) => Ok((body.as_bytes().to_vec(), false)),
            Payload::Sealed(blob) => {
                let secret = self
                    .hpke_secret
                    .as_ref()
                    .ok_or(ProtocolError::DecryptionUnavailable)?;
                Ok((open(secret, blob)?, true))
            }
        }
    }

    fn check_actor(envelope: &Envelope, message: &ActionMessage) -> Result<(), ProtocolError> {
        if let Some(inner) = message.signing_actor() {
            if envelope.actor != inner {
                return Err(ProtocolError::ActorMismatch {
                    outer: envelope.actor.clone(),
                    inner: inner.to_string(),
                });
            }
        }
        if let ActionMessage::BurnDown {
            actor, operator, ..
        } = message
        {
            if actor_domain(actor) != actor_domain(operator) {
                return Err(ProtocolError::CrossHostBurnDown {
                    operator: operator.clone(),
                    target: actor.clone(),
                });
            }
        }
        Ok(())
    }

    fn run(&self, raw: &str, transport: Transport) -> Result<ProcessOutcome, ProtocolError> {
        let envelope = Envelope::parse(raw)?;
        let (body, sealed) = self.open_payload(envelope.payload()?)?;
        let bundle = SignedBundle::parse(&body)?;
        let action = bundle.action;

        check_encryption_policy(action, sealed, transport)?;

        if action.checks_recency() {
            let root = bundle
                .recent_merkle_root
                .ok_or_else(|| ProtocolError::bundle("missing recent-merkle-root"))?;
            self.log.assert_recent_merkle_root(&root)?;
        }

        let keys = bundle.attribute_keys()?;
        let message = ActionMessage::parse(action, bundle.decrypted_message(&keys)?)?;
        Self::check_actor(&envelope, &message)?;

        let authorized = verify::authorize(self.log.store().as_ref(), &bundle, &message)?;

        let now = self.log.time_source().now();
        let draft = LeafDraft::new(
            bundle.leaf_contents()?,
            authorized.signature,
            &authorized.signer,
            now,
        );
        let mut transition = ActionTransition::new(&message, &authorized.authorization, &keys, now);
        let leaf = self.log.insert_leaf(draft, &mut transition)?;
        let result = transition
            .into_result()
            .ok_or_else(|| ProtocolError::bundle("transition produced no result"))?;

        info!(
            action = %action,
            leaf_id = leaf.id,
            root = %leaf.root,
            sealed,
            "[pkd-03] action accepted"
        );
        Ok(ProcessOutcome {
            action,
            result,
            latest_root: leaf.root,
            leaf_id: leaf.id,
        })
    }
}

impl ProtocolApi for ProtocolService {
    fn process(
        &self,
        message: &str,
        transport: Transport,
    ) -> Result<ProcessOutcome, ProtocolError> {
        self.run(message, transport).map_err(|e| {
            warn!(error = %e, class = %e.class(), ?transport, "[pkd-03] message rejected");
            e
        })
    }
}
