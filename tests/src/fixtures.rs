//! Message builders shared by the integration flows and the benchmarks.

use pkd_01_merkle_log::{MerkleLog, MerkleLogApi};
use pkd_03_protocol::{Action, Envelope, SignedBundle};
use pkd_crypto::{seal, AttributeKey, Ed25519KeyPair, HpkePublicKey};
use pkd_types::Ciphersuite;
use serde_json::{json, Map, Value};

/// One federated account and the key it signs with.
pub struct Client {
    pub actor: String,
    pub keypair: Ed25519KeyPair,
}

impl Client {
    /// Deterministic client for `actor`.
    pub fn new(actor: &str, seed: u8) -> Self {
        Self {
            actor: actor.to_string(),
            keypair: Ed25519KeyPair::from_seed([seed; 32]),
        }
    }

    /// Base64url public key.
    pub fn public_key(&self) -> String {
        self.keypair.public_key().to_b64()
    }

    /// Start a message for `action` citing `log`'s current root.
    pub fn message(&self, log: &MerkleLog, action: Action, fields: Value) -> MessageBuilder<'_> {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let root = log.latest_root().ok();
        MessageBuilder {
            client: self,
            bundle: SignedBundle::new(action, fields, root),
        }
    }

    /// Self-signed AddKey envelope, plaintext.
    pub fn add_own_key(&self, log: &MerkleLog) -> String {
        self.message(
            log,
            Action::AddKey,
            json!({"actor": self.actor, "public-key": self.public_key()}),
        )
        .plaintext()
    }
}

/// A bundle on its way to becoming an envelope.
pub struct MessageBuilder<'a> {
    client: &'a Client,
    bundle: SignedBundle,
}

impl MessageBuilder<'_> {
    /// Encrypt `attribute` under `key`.
    pub fn encrypt(mut self, attribute: &str, key: &AttributeKey) -> Self {
        self.bundle = self
            .bundle
            .encrypt_attribute(attribute, key)
            .expect("attribute present and a string");
        self
    }

    fn signed_json(self) -> (String, String) {
        let actor = self.client.actor.clone();
        let bundle = self
            .bundle
            .sign(&self.client.keypair)
            .expect("bundle signs");
        (actor, bundle.to_json().expect("bundle encodes"))
    }

    /// Plaintext envelope JSON.
    pub fn plaintext(self) -> String {
        let (actor, body) = self.signed_json();
        Envelope::plaintext(&actor, body)
            .to_json()
            .expect("envelope encodes")
    }

    /// Envelope sealed to the directory.
    pub fn sealed(self, directory: &HpkePublicKey) -> String {
        let (actor, body) = self.signed_json();
        let blob = seal(directory, Ciphersuite::default(), body.as_bytes()).expect("seal");
        Envelope::sealed(&actor, blob)
            .to_json()
            .expect("envelope encodes")
    }
}
