//! # Request Handler
//!
//! One JSON request in, one JSON response out. Routing and transport are
//! someone else's job; this layer only maps requests onto subsystem calls
//! and errors onto structured responses.
//!
//! ```text
//! {"method": "submit", "message": "...", "relayed": false}
//!   → {"ok": true, "result": {...}}
//!   → {"ok": false,
//!      "error": {"context-id": "<uuid>", "class": "policy-violation", "message": "..."}}
//! ```

use crate::container::DirectoryContainer;
use pkd_01_merkle_log::{MerkleLogApi, MerkleLogError};
use pkd_02_trust_store::{TrustStoreApi, TrustStoreError};
use pkd_03_protocol::{ProtocolApi, ProtocolError, Transport};
use pkd_04_replication::{PeerRegistryApi, ReplicationError};
use pkd_05_witness::{WitnessError, WitnessRegistryApi};
use pkd_crypto::b64_encode;
use pkd_types::{
    AuxDataRecord, Classified, ErrorClass, KeyRecord, LeafId, MerkleLeaf, MerkleRoot,
    WitnessCosignature,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// A request, tagged by `method`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum Request {
    /// Submit a protocol message envelope.
    Submit {
        message: String,
        #[serde(default)]
        relayed: bool,
    },
    /// Current root and size.
    LatestRoot,
    /// One leaf by id.
    #[serde(rename_all = "kebab-case")]
    LeafById { leaf_id: LeafId },
    /// One leaf by the root it produced.
    LeafByRoot { root: MerkleRoot },
    /// Leaf hashes after `root`.
    HashesSince {
        root: MerkleRoot,
        #[serde(default = "default_limit")]
        limit: usize,
        #[serde(default)]
        offset: usize,
    },
    /// Trusted keys of an actor.
    PublicKeys { actor: String },
    /// Every key an actor held.
    KeyHistory { actor: String },
    /// Trusted aux data of an actor.
    AuxData { actor: String },
    /// Rewrapped attribute keys for one peer and leaf.
    #[serde(rename_all = "kebab-case")]
    RewrappedKeys { peer: String, leaf_id: LeafId },
    /// Store a witness cosignature.
    #[serde(rename_all = "kebab-case")]
    AddCosignature {
        origin: String,
        merkle_root: MerkleRoot,
        cosignature: String,
    },
    /// Cosignatures over one root.
    #[serde(rename_all = "kebab-case")]
    Cosignatures { merkle_root: MerkleRoot },
}

fn default_limit() -> usize {
    100
}

/// Anything a request can fail with.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Request is not valid JSON of a known method.
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Log(#[from] MerkleLogError),
    #[error(transparent)]
    Trust(#[from] TrustStoreError),
    #[error(transparent)]
    Replication(#[from] ReplicationError),
    #[error(transparent)]
    Witness(#[from] WitnessError),
    /// Response could not be encoded.
    #[error("response encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl Classified for HandlerError {
    fn class(&self) -> ErrorClass {
        match self {
            HandlerError::BadRequest(_) => ErrorClass::PolicyViolation,
            HandlerError::Protocol(e) => e.class(),
            HandlerError::Log(e) => e.class(),
            HandlerError::Trust(e) => e.class(),
            HandlerError::Replication(e) => e.class(),
            HandlerError::Witness(e) => e.class(),
            HandlerError::Encoding(_) => ErrorClass::StorageInvariant,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct LeafView {
    leaf_id: LeafId,
    contents: String,
    contents_hash: String,
    signature: String,
    public_key_hash: String,
    inclusion_proof: Vec<String>,
    merkle_root: MerkleRoot,
    created: u64,
}

impl From<MerkleLeaf> for LeafView {
    fn from(leaf: MerkleLeaf) -> Self {
        Self {
            leaf_id: leaf.id,
            contents: String::from_utf8_lossy(&leaf.contents).into_owned(),
            contents_hash: hex::encode(leaf.contents_hash),
            signature: b64_encode(&leaf.signature),
            public_key_hash: hex::encode(leaf.public_key_hash),
            inclusion_proof: leaf.inclusion_proof.iter().map(hex::encode).collect(),
            merkle_root: leaf.root,
            created: leaf.created,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct KeyView {
    key_id: String,
    actor: String,
    public_key: String,
    trusted: bool,
    insert_leaf: LeafId,
    revoke_leaf: Option<LeafId>,
}

impl From<KeyRecord> for KeyView {
    fn from(key: KeyRecord) -> Self {
        Self {
            key_id: key.key_id,
            actor: key.actor,
            public_key: b64_encode(&key.public_key),
            trusted: key.trusted,
            insert_leaf: key.insert_leaf,
            revoke_leaf: key.revoke_leaf,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct AuxView {
    aux_id: String,
    aux_type: String,
    aux_data: String,
    insert_leaf: LeafId,
}

impl From<AuxDataRecord> for AuxView {
    fn from(aux: AuxDataRecord) -> Self {
        Self {
            aux_id: aux.aux_id,
            aux_type: aux.aux_type,
            aux_data: aux.aux_data,
            insert_leaf: aux.insert_leaf,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct CosignatureView {
    leaf_id: LeafId,
    witness: String,
    merkle_root: MerkleRoot,
    hostname: String,
    timestamp: u64,
    signature: String,
}

impl From<WitnessCosignature> for CosignatureView {
    fn from(c: WitnessCosignature) -> Self {
        Self {
            leaf_id: c.leaf_id,
            witness: c.witness,
            merkle_root: c.merkle_root,
            hostname: c.hostname,
            timestamp: c.timestamp,
            signature: b64_encode(&c.signature),
        }
    }
}

fn views<T, V: From<T>>(items: Vec<T>) -> Vec<V> {
    items.into_iter().map(V::from).collect()
}

/// Dispatches requests against one container.
pub struct RequestHandler<'a> {
    container: &'a DirectoryContainer,
}

impl<'a> RequestHandler<'a> {
    /// Handler over `container`.
    pub fn new(container: &'a DirectoryContainer) -> Self {
        Self { container }
    }

    /// Parse and serve one raw request. Never fails; errors become
    /// `{"ok": false, ...}` responses.
    pub fn handle(&self, raw: &str) -> Value {
        let result = serde_json::from_str::<Request>(raw)
            .map_err(|e| HandlerError::BadRequest(e.to_string()))
            .and_then(|request| self.dispatch(request));

        match result {
            Ok(result) => json!({ "ok": true, "result": result }),
            Err(err) => error_response(&err),
        }
    }

    /// Serve one parsed request.
    pub fn dispatch(&self, request: Request) -> Result<Value, HandlerError> {
        let c = self.container;
        debug!(?request, "[runtime] request");
        let value = match request {
            Request::Submit { message, relayed } => {
                let outcome = c
                    .protocol
                    .process(&message, Transport::from_relayed(relayed))?;
                serde_json::to_value(outcome)?
            }
            Request::LatestRoot => json!({
                "merkle-root": c.log.latest_root()?,
                "leaf-count": c.log.leaf_count()?,
            }),
            Request::LeafById { leaf_id } => {
                serde_json::to_value(c.log.leaf_by_id(leaf_id)?.map(LeafView::from))?
            }
            Request::LeafByRoot { root } => {
                serde_json::to_value(c.log.leaf_by_root(&root)?.map(LeafView::from))?
            }
            Request::HashesSince {
                root,
                limit,
                offset,
            } => {
                let hashes: Vec<Value> = c
                    .log
                    .hashes_since(&root, limit, offset)?
                    .into_iter()
                    .map(|h| {
                        json!({
                            "leaf-id": h.id,
                            "merkle-root": h.root,
                            "contents-hash": hex::encode(h.contents_hash),
                            "public-key-hash": hex::encode(h.public_key_hash),
                            "created": h.created,
                        })
                    })
                    .collect();
                Value::Array(hashes)
            }
            Request::PublicKeys { actor } => {
                serde_json::to_value(views::<_, KeyView>(c.trust.public_keys(&actor)?))?
            }
            Request::KeyHistory { actor } => {
                serde_json::to_value(views::<_, KeyView>(c.trust.key_history(&actor)?))?
            }
            Request::AuxData { actor } => {
                serde_json::to_value(views::<_, AuxView>(c.trust.aux_data(&actor)?))?
            }
            Request::RewrappedKeys { peer, leaf_id } => {
                let rows: Vec<Value> = c
                    .peers
                    .rewrapped_keys(&peer, leaf_id)?
                    .into_iter()
                    .map(|k| json!({ "attribute": k.attribute, "ciphertext": k.ciphertext }))
                    .collect();
                Value::Array(rows)
            }
            Request::AddCosignature {
                origin,
                merkle_root,
                cosignature,
            } => serde_json::to_value(CosignatureView::from(
                c.witness
                    .add_witness_cosignature(&origin, &merkle_root, &cosignature)?,
            ))?,
            Request::Cosignatures { merkle_root } => serde_json::to_value(
                views::<_, CosignatureView>(c.witness.cosignatures_for_root(&merkle_root)?),
            )?,
        };
        Ok(value)
    }
}

/// Structured error body. The context id ties the response to the log line.
fn error_response(err: &HandlerError) -> Value {
    let context_id = Uuid::new_v4();
    let class = err.class();
    warn!(%context_id, %class, error = %err, "[runtime] request failed");
    json!({
        "ok": false,
        "error": {
            "context-id": context_id.to_string(),
            "class": class.as_str(),
            "message": err.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::DirectoryConfig;

    fn container() -> DirectoryContainer {
        DirectoryContainer::new(DirectoryConfig::default()).unwrap()
    }

    #[test]
    fn test_latest_root_on_empty_log() {
        let container = container();
        let response = RequestHandler::new(&container).handle(r#"{"method":"latest-root"}"#);
        assert_eq!(response["ok"], true);
        assert_eq!(response["result"]["leaf-count"], 0);
        assert!(response["result"]["merkle-root"]
            .as_str()
            .unwrap()
            .starts_with("pkd-mr-v1:"));
    }

    #[test]
    fn test_unknown_method_is_policy_violation() {
        let container = container();
        let response = RequestHandler::new(&container).handle(r#"{"method":"drop-tables"}"#);
        assert_eq!(response["ok"], false);
        assert_eq!(response["error"]["class"], "policy-violation");
        let id = response["error"]["context-id"].as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[test]
    fn test_garbage_envelope_is_rejected() {
        let container = container();
        let request = json!({"method": "submit", "message": "not json"}).to_string();
        let response = RequestHandler::new(&container).handle(&request);
        assert_eq!(response["ok"], false);
        assert_eq!(response["error"]["class"], "policy-violation");
    }

    #[test]
    fn test_missing_leaf_is_null() {
        let container = container();
        let response =
            RequestHandler::new(&container).handle(r#"{"method":"leaf-by-id","leaf-id":7}"#);
        assert_eq!(response["ok"], true);
        assert!(response["result"].is_null());
    }

    #[test]
    fn test_unknown_actor_reported() {
        let container = container();
        let response = RequestHandler::new(&container)
            .handle(r#"{"method":"public-keys","actor":"https://nobody.example/u/x"}"#);
        assert_eq!(response["ok"], false);
        assert!(response["error"]["message"]
            .as_str()
            .unwrap()
            .contains("actor not found"));
    }
}
