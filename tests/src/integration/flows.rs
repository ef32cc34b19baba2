//! # Integration Test Flows
//!
//! Drives the whole directory through the runtime's request handler:
//!
//! 1. **Protocol → Trust Store**: accepted actions change key state
//! 2. **Protocol → Replication**: attribute keys are rewrapped for replicas
//! 3. **Log → Witness**: published roots collect cosignatures
//! 4. **Peer → Protocol**: replicas report their mirrored state

#[cfg(test)]
mod tests {
    use crate::fixtures::Client;
    use pkd_01_merkle_log::MerkleLogApi;
    use pkd_03_protocol::{revocation, Action, SignedBundle, Envelope};
    use pkd_crypto::{open, AttributeKey, Ed25519KeyPair, HpkeKeyPair};
    use pkd_runtime::{DirectoryConfig, DirectoryContainer, RequestHandler};
    use pkd_types::{Ciphersuite, MerkleRoot, Peer, RewrapConfig};
    use pkd_05_witness::Cosignature;
    use serde_json::{json, Value};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const HOST: &str = "pkd.example";
    const ALICE: &str = "https://social.example/users/alice";

    struct Deployment {
        container: DirectoryContainer,
        directory: HpkeKeyPair,
        replica: HpkeKeyPair,
        witness: Ed25519KeyPair,
        mirror: Ed25519KeyPair,
    }

    impl Deployment {
        fn new() -> Self {
            let directory = HpkeKeyPair::derive(b"directory hpke seed for integration tests");
            let replica = HpkeKeyPair::derive(b"replica hpke seed for integration tests!!");
            let witness = Ed25519KeyPair::from_seed([0x57; 32]);
            let mirror = Ed25519KeyPair::from_seed([0x4d; 32]);

            let mut secret = [0u8; 32];
            secret.copy_from_slice(&directory.secret.to_bytes());

            let mut config = DirectoryConfig::default();
            config.hostname = HOST.to_string();
            config.security.hpke_secret_key = Some(secret);
            config
                .security
                .witnesses
                .insert("witness.example".into(), *witness.public_key().as_bytes());
            config.replication.peers = vec![
                Peer {
                    hostname: "replica.example".into(),
                    public_key: [9; 32],
                    cosign: false,
                    replicate: true,
                    mirrored_root: None,
                    mirrored_leaf_count: 0,
                    rewrap: Some(RewrapConfig {
                        hpke_public_key: replica.public.to_bytes(),
                        ciphersuite: Ciphersuite::X25519Sha256ChaCha20Poly1305,
                    }),
                },
                Peer {
                    hostname: "mirror.example".into(),
                    public_key: *mirror.public_key().as_bytes(),
                    cosign: true,
                    replicate: true,
                    mirrored_root: None,
                    mirrored_leaf_count: 0,
                    rewrap: None,
                },
            ];

            Self {
                container: DirectoryContainer::new(config).unwrap(),
                directory,
                replica,
                witness,
                mirror,
            }
        }

        fn call(&self, request: Value) -> Value {
            RequestHandler::new(&self.container).handle(&request.to_string())
        }

        fn ok(&self, request: Value) -> Value {
            let response = self.call(request);
            assert_eq!(response["ok"], true, "unexpected failure: {response}");
            response["result"].clone()
        }

        fn submit(&self, envelope: String, relayed: bool) -> Value {
            self.call(json!({"method": "submit", "message": envelope, "relayed": relayed}))
        }

        fn log(&self) -> &pkd_01_merkle_log::MerkleLog {
            &self.container.log
        }
    }

    // =============================================================================
    // PROTOCOL → TRUST STORE → REPLICATION
    // =============================================================================

    #[test]
    fn test_sealed_enrollment_over_relay_is_rewrapped_for_replica() {
        let pkd = Deployment::new();
        let alice = Client::new(ALICE, 1);
        let actor_key = AttributeKey::generate();

        let envelope = alice
            .message(
                pkd.log(),
                Action::AddKey,
                json!({"actor": ALICE, "public-key": alice.public_key()}),
            )
            .encrypt("actor", &actor_key)
            .sealed(&pkd.directory.public);
        let response = pkd.submit(envelope, true);
        assert_eq!(response["ok"], true, "{response}");
        assert_eq!(response["result"]["leaf-id"], 1);
        assert_eq!(response["result"]["result"]["kind"], "key-added");

        let keys = pkd.ok(json!({"method": "public-keys", "actor": ALICE}));
        assert_eq!(keys.as_array().unwrap().len(), 1);
        assert_eq!(keys[0]["public-key"], alice.public_key());
        assert_eq!(keys[0]["insert-leaf"], 1);

        // the public leaf hides the actor, the replica can still read it
        let leaf = pkd.ok(json!({"method": "leaf-by-id", "leaf-id": 1}));
        assert!(!leaf["contents"].as_str().unwrap().contains(ALICE));

        let rewrapped = pkd.ok(json!({
            "method": "rewrapped-keys",
            "peer": "replica.example",
            "leaf-id": 1,
        }));
        assert_eq!(rewrapped[0]["attribute"], "actor");
        let opened = open(
            &pkd.replica.secret,
            rewrapped[0]["ciphertext"].as_str().unwrap(),
        )
        .unwrap();
        assert_eq!(opened, actor_key.as_bytes().to_vec());

        // no rewrap config, no rows
        let none = pkd.ok(json!({
            "method": "rewrapped-keys",
            "peer": "mirror.example",
            "leaf-id": 1,
        }));
        assert!(none.as_array().unwrap().is_empty());
    }

    #[test]
    fn test_plaintext_over_relay_rejected_without_a_leaf() {
        let pkd = Deployment::new();
        let alice = Client::new(ALICE, 1);

        let response = pkd.submit(alice.add_own_key(pkd.log()), true);
        assert_eq!(response["ok"], false);
        assert_eq!(response["error"]["class"], "policy-violation");
        assert!(response["error"]["context-id"].is_string());

        let head = pkd.ok(json!({"method": "latest-root"}));
        assert_eq!(head["leaf-count"], 0);
    }

    // =============================================================================
    // KEY COMPROMISE AND MIGRATION
    // =============================================================================

    #[test]
    fn test_compromised_device_revoked_then_identity_moved() {
        let pkd = Deployment::new();
        let alice = Client::new(ALICE, 1);
        let phone = Client::new(ALICE, 2);

        assert_eq!(pkd.submit(alice.add_own_key(pkd.log()), false)["ok"], true);
        let add_phone = alice
            .message(
                pkd.log(),
                Action::AddKey,
                json!({"actor": ALICE, "public-key": phone.public_key()}),
            )
            .plaintext();
        assert_eq!(pkd.submit(add_phone, false)["ok"], true);

        // anyone holding the phone's revocation token can kill it
        let token_bundle = SignedBundle::new(
            Action::RevokeKeyThirdParty,
            json!({"revocation-token": revocation::issue(&phone.keypair)})
                .as_object()
                .cloned()
                .unwrap(),
            None,
        );
        let token_json = token_bundle.to_json().unwrap();
        let envelope = Envelope::plaintext("https://bystander.example/u/bob", token_json)
            .to_json()
            .unwrap();
        let revoked = pkd.submit(envelope, false);
        assert_eq!(revoked["ok"], true, "{revoked}");
        assert_eq!(revoked["result"]["result"]["kind"], "keys-revoked");

        let phone_fireproof = phone
            .message(pkd.log(), Action::Fireproof, json!({"actor": ALICE}))
            .plaintext();
        assert_eq!(pkd.submit(phone_fireproof, false)["ok"], false);

        let new_home = "https://other.example/users/alice";
        let moved = alice
            .message(
                pkd.log(),
                Action::MoveIdentity,
                json!({"old-actor": ALICE, "new-actor": new_home}),
            )
            .plaintext();
        assert_eq!(pkd.submit(moved, false)["ok"], true);

        let old_keys = pkd.ok(json!({"method": "public-keys", "actor": ALICE}));
        assert!(old_keys.as_array().unwrap().is_empty());
        let new_keys = pkd.ok(json!({"method": "public-keys", "actor": new_home}));
        assert_eq!(new_keys.as_array().unwrap().len(), 1);
        assert_eq!(new_keys[0]["public-key"], alice.public_key());

        let history = pkd.ok(json!({"method": "key-history", "actor": ALICE}));
        assert!(history
            .as_array()
            .unwrap()
            .iter()
            .any(|k| k["revoke-leaf"] == 3));
    }

    // =============================================================================
    // WITNESSES AND MIRRORS
    // =============================================================================

    #[test]
    fn test_witness_cosigns_published_root() {
        let pkd = Deployment::new();
        let alice = Client::new(ALICE, 1);
        pkd.submit(alice.add_own_key(pkd.log()), false);

        let root = pkd.log().latest_root().unwrap();
        let cosignature = Cosignature::sign(&pkd.witness, HOST, root, 1_700_000_000);
        let request = json!({
            "method": "add-cosignature",
            "origin": "witness.example",
            "merkle-root": root,
            "cosignature": serde_json::to_string(&cosignature).unwrap(),
        });
        let stored = pkd.ok(request.clone());
        assert_eq!(stored["leaf-id"], 1);
        pkd.ok(request);

        let all = pkd.ok(json!({"method": "cosignatures", "merkle-root": root}));
        assert_eq!(all.as_array().unwrap().len(), 2);

        let forged = Cosignature::sign(&Ed25519KeyPair::from_seed([1; 32]), HOST, root, 1);
        let rejected = pkd.call(json!({
            "method": "add-cosignature",
            "origin": "witness.example",
            "merkle-root": root,
            "cosignature": serde_json::to_string(&forged).unwrap(),
        }));
        assert_eq!(rejected["ok"], false);
    }

    #[test]
    fn test_mirror_syncs_and_checkpoints() {
        let pkd = Deployment::new();
        for seed in 1..=3u8 {
            let client = Client::new(&format!("https://social.example/users/u{seed}"), seed);
            assert_eq!(pkd.submit(client.add_own_key(pkd.log()), false)["ok"], true);
        }

        let empty = MerkleRoot::from_hash(pkd_01_merkle_log::empty_root());
        let hashes = pkd.ok(json!({"method": "hashes-since", "root": empty}));
        let hashes = hashes.as_array().unwrap();
        assert_eq!(hashes.len(), 3);
        let mirrored_root = hashes[2]["merkle-root"].clone();

        let mirror = Client {
            actor: "mirror.example".into(),
            keypair: Ed25519KeyPair::from_seed([0x4d; 32]),
        };
        let checkpoint = mirror
            .message(
                pkd.log(),
                Action::Checkpoint,
                json!({
                    "from-directory": "mirror.example",
                    "from-root": mirrored_root,
                    "from-leaf-count": 3,
                }),
            )
            .plaintext();
        let response = pkd.submit(checkpoint, false);
        assert_eq!(response["ok"], true, "{response}");
        assert_eq!(response["result"]["result"]["leaf-count"], 3);

        let store = pkd.container.log.store();
        let peer = pkd_04_replication::peers::peer(store.as_ref(), "mirror.example")
            .unwrap()
            .unwrap();
        assert_eq!(peer.mirrored_leaf_count, 3);
        assert_eq!(*pkd.mirror.public_key().as_bytes(), peer.public_key);
    }
}
