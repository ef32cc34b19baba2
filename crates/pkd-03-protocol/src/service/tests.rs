//! # Protocol Service Tests

use super::*;
use crate::domain::action::Action;
use crate::domain::outcome::ActionResult;
use crate::domain::revocation;
use pkd_01_merkle_log::{
    InMemoryKVStore, ManualTimeSource, MerkleLogConfig, MerkleLogDependencies,
};
use pkd_02_trust_store::{TrustStore, TrustStoreApi, TrustStoreError};
use pkd_04_replication::{PeerRegistryApi, PeerStore};
use pkd_crypto::{seal, AttributeKey, Ed25519KeyPair, HpkeKeyPair, Totp};
use pkd_types::{Ciphersuite, ErrorClass, MerkleRoot, Peer, RewrapConfig};
use serde_json::{json, Map, Value};

const ALICE: &str = "https://a.example/users/alice";
const ADMIN: &str = "https://a.example/users/admin";
const NOW: u64 = 1_700_000_000;

struct Directory {
    service: ProtocolService,
    trust: TrustStore,
    peers: PeerStore,
    clock: Arc<ManualTimeSource>,
    hpke: HpkeKeyPair,
}

/// How a test message is packaged.
#[derive(Clone, Copy)]
struct Delivery {
    sealed: bool,
    transport: Transport,
}

const PLAIN: Delivery = Delivery {
    sealed: false,
    transport: Transport::Direct,
};
const SEALED: Delivery = Delivery {
    sealed: true,
    transport: Transport::Direct,
};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

impl Directory {
    fn new() -> Self {
        let store = Arc::new(InMemoryKVStore::new());
        let clock = Arc::new(ManualTimeSource::new(NOW));
        let deps = MerkleLogDependencies {
            time_source: clock.clone(),
            ..MerkleLogDependencies::with_store(store)
        };
        let log = Arc::new(MerkleLog::new(deps, MerkleLogConfig::default()));
        let hpke = HpkeKeyPair::generate();
        Self {
            trust: TrustStore::new(log.clone()),
            peers: PeerStore::new(log.clone()),
            service: ProtocolService::new(log, Some(hpke.secret.clone())),
            clock,
            hpke,
        }
    }

    fn root(&self) -> MerkleRoot {
        self.service.log().latest_root().unwrap()
    }

    fn envelope(&self, actor: &str, bundle: &SignedBundle, how: Delivery) -> String {
        let json = bundle.to_json().unwrap();
        let envelope = if how.sealed {
            let blob = seal(&self.hpke.public, Ciphersuite::default(), json.as_bytes()).unwrap();
            Envelope::sealed(actor, blob)
        } else {
            Envelope::plaintext(actor, json)
        };
        envelope.to_json().unwrap()
    }

    fn submit_bundle(
        &self,
        actor: &str,
        bundle: SignedBundle,
        how: Delivery,
    ) -> Result<ProcessOutcome, ProtocolError> {
        self.service
            .process(&self.envelope(actor, &bundle, how), how.transport)
    }

    fn submit(
        &self,
        action: Action,
        message: Value,
        signer: &Ed25519KeyPair,
        actor: &str,
        how: Delivery,
    ) -> Result<ProcessOutcome, ProtocolError> {
        let bundle = SignedBundle::new(action, object(message), Some(self.root()))
            .sign(signer)
            .unwrap();
        self.submit_bundle(actor, bundle, how)
    }

    fn add_key(
        &self,
        actor: &str,
        key: &Ed25519KeyPair,
        signer: &Ed25519KeyPair,
    ) -> Result<ProcessOutcome, ProtocolError> {
        self.submit(
            Action::AddKey,
            json!({
                "actor": actor,
                "public-key": key.public_key().to_b64(),
                "time": NOW.to_string(),
            }),
            signer,
            actor,
            PLAIN,
        )
    }

    fn leaf_count(&self) -> u64 {
        self.service.log().leaf_count().unwrap()
    }
}

fn keypair(seed: u8) -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed([seed; 32])
}

// =============================================================================
// KEY LIFECYCLE
// =============================================================================

#[test]
fn test_bootstrap_add_key() {
    let dir = Directory::new();
    let alice = keypair(1);

    let outcome = dir.add_key(ALICE, &alice, &alice).unwrap();
    assert_eq!(outcome.action, Action::AddKey);
    assert_eq!(outcome.leaf_id, 1);
    assert_eq!(outcome.latest_root, dir.root());
    assert!(matches!(outcome.result, ActionResult::KeyAdded { .. }));

    let keys = dir.trust.public_keys(ALICE).unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(&keys[0].public_key, alice.public_key().as_bytes());
    assert_eq!(keys[0].insert_leaf, 1);
}

#[test]
fn test_add_key_signed_by_unrelated_key_rejected() {
    let dir = Directory::new();
    let alice = keypair(1);
    dir.add_key(ALICE, &alice, &alice).unwrap();

    let mallory = keypair(9);
    let err = dir.add_key(ALICE, &mallory, &mallory).unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidSignature { .. }));
    assert_eq!(err.class(), ErrorClass::PolicyViolation);
    assert_eq!(dir.leaf_count(), 1);
    assert_eq!(dir.trust.public_keys(ALICE).unwrap().len(), 1);
}

#[test]
fn test_add_second_key_signed_by_trusted_key() {
    let dir = Directory::new();
    let alice = keypair(1);
    let laptop = keypair(2);
    dir.add_key(ALICE, &alice, &alice).unwrap();
    dir.add_key(ALICE, &laptop, &alice).unwrap();
    assert_eq!(dir.trust.public_keys(ALICE).unwrap().len(), 2);
}

#[test]
fn test_revoked_key_can_no_longer_sign() {
    let dir = Directory::new();
    let alice = keypair(1);
    let laptop = keypair(2);
    dir.add_key(ALICE, &alice, &alice).unwrap();
    dir.add_key(ALICE, &laptop, &alice).unwrap();

    let outcome = dir
        .submit(
            Action::RevokeKey,
            json!({"actor": ALICE, "public-key": laptop.public_key().to_b64()}),
            &alice,
            ALICE,
            PLAIN,
        )
        .unwrap();
    assert!(matches!(
        outcome.result,
        ActionResult::KeysRevoked { ref key_ids } if key_ids.len() == 1
    ));

    let err = dir
        .submit(
            Action::Fireproof,
            json!({"actor": ALICE}),
            &laptop,
            ALICE,
            PLAIN,
        )
        .unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidSignature { .. }));
}

#[test]
fn test_revoke_unknown_key_rolls_back() {
    let dir = Directory::new();
    let alice = keypair(1);
    dir.add_key(ALICE, &alice, &alice).unwrap();
    let root_before = dir.root();

    let err = dir
        .submit(
            Action::RevokeKey,
            json!({"actor": ALICE, "public-key": keypair(3).public_key().to_b64()}),
            &alice,
            ALICE,
            PLAIN,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::Trust(TrustStoreError::KeyNotFound { .. })
    ));
    assert_eq!(dir.leaf_count(), 1);
    assert_eq!(dir.root(), root_before);
}

#[test]
fn test_revoke_key_third_party_needs_no_root() {
    let dir = Directory::new();
    let alice = keypair(1);
    dir.add_key(ALICE, &alice, &alice).unwrap();

    let token = revocation::issue(&alice);
    let bundle = SignedBundle::new(
        Action::RevokeKeyThirdParty,
        object(json!({"revocation-token": token})),
        None,
    );
    let outcome = dir.submit_bundle(ALICE, bundle, PLAIN).unwrap();
    assert!(matches!(outcome.result, ActionResult::KeysRevoked { .. }));
    assert!(dir.trust.public_keys(ALICE).unwrap().is_empty());

    // the token is spent: nothing left to revoke
    let again = SignedBundle::new(
        Action::RevokeKeyThirdParty,
        object(json!({"revocation-token": revocation::issue(&alice)})),
        None,
    );
    let err = dir.submit_bundle(ALICE, again, PLAIN).unwrap_err();
    assert!(matches!(err, ProtocolError::Trust(TrustStoreError::NoMatchingKey)));
}

#[test]
fn test_move_identity() {
    let dir = Directory::new();
    let alice = keypair(1);
    let new_url = "https://b.example/users/alice";
    dir.add_key(ALICE, &alice, &alice).unwrap();

    let outcome = dir
        .submit(
            Action::MoveIdentity,
            json!({"old-actor": ALICE, "new-actor": new_url}),
            &alice,
            ALICE,
            PLAIN,
        )
        .unwrap();
    assert_eq!(
        outcome.result,
        ActionResult::IdentityMoved {
            new_actor: new_url.to_string(),
            keys: 1
        }
    );
    assert_eq!(dir.trust.public_keys(new_url).unwrap().len(), 1);
    assert_eq!(
        dir.trust.actor(ALICE).unwrap().unwrap().moved_to.as_deref(),
        Some(new_url)
    );

    // the moved key now signs for the new actor
    dir.submit(Action::Fireproof, json!({"actor": new_url}), &alice, new_url, PLAIN)
        .unwrap();
}

// =============================================================================
// BURN DOWN
// =============================================================================

fn burn_down(
    dir: &Directory,
    admin: &Ed25519KeyPair,
    otp: Option<String>,
) -> Result<ProcessOutcome, ProtocolError> {
    let mut message = json!({"actor": ALICE, "operator": ADMIN});
    if let Some(otp) = otp {
        message["otp"] = Value::String(otp);
    }
    dir.submit(Action::BurnDown, message, admin, ADMIN, PLAIN)
}

#[test]
fn test_fireproof_gates_burn_down() {
    let dir = Directory::new();
    let alice = keypair(1);
    let admin = keypair(2);
    dir.add_key(ALICE, &alice, &alice).unwrap();
    dir.add_key(ADMIN, &admin, &admin).unwrap();
    dir.submit(Action::Fireproof, json!({"actor": ALICE}), &alice, ALICE, PLAIN)
        .unwrap();

    let err = burn_down(&dir, &admin, None).unwrap_err();
    assert!(err.to_string().contains("fireproof conflict"));

    dir.submit(Action::UndoFireproof, json!({"actor": ALICE}), &alice, ALICE, PLAIN)
        .unwrap();
    let outcome = burn_down(&dir, &admin, None).unwrap();
    assert!(matches!(
        outcome.result,
        ActionResult::KeysRevoked { ref key_ids } if key_ids.len() == 1
    ));
    assert!(dir.trust.public_keys(ALICE).unwrap().is_empty());
}

#[test]
fn test_burn_down_second_factor_replay() {
    let dir = Directory::new();
    let alice = keypair(1);
    let admin = keypair(2);
    let secret = b"12345678901234567890";
    dir.add_key(ALICE, &alice, &alice).unwrap();
    dir.add_key(ALICE, &keypair(3), &alice).unwrap();
    dir.add_key(ADMIN, &admin, &admin).unwrap();
    dir.trust.enroll_second_factor("a.example", secret).unwrap();
    let totp = Totp::new(&secret[..]);

    let missing = burn_down(&dir, &admin, None).unwrap_err();
    assert!(matches!(
        missing,
        ProtocolError::Trust(TrustStoreError::SecondFactorInvalid { .. })
    ));

    let code = totp.code_at(NOW);
    burn_down(&dir, &admin, Some(code.clone())).unwrap();

    // same step again: replay
    dir.add_key(ALICE, &keypair(4), &keypair(4)).unwrap();
    let replay = burn_down(&dir, &admin, Some(code)).unwrap_err();
    assert!(matches!(
        replay,
        ProtocolError::Trust(TrustStoreError::SecondFactorReused { .. })
    ));

    dir.clock.advance(30);
    burn_down(&dir, &admin, Some(totp.code_at(NOW + 30))).unwrap();
}

#[test]
fn test_burn_down_across_hosts_rejected() {
    let dir = Directory::new();
    let alice = keypair(1);
    let outsider = keypair(2);
    let outsider_url = "https://elsewhere.example/users/admin";
    dir.add_key(ALICE, &alice, &alice).unwrap();
    dir.add_key(outsider_url, &outsider, &outsider).unwrap();

    let err = dir
        .submit(
            Action::BurnDown,
            json!({"actor": ALICE, "operator": outsider_url}),
            &outsider,
            outsider_url,
            PLAIN,
        )
        .unwrap_err();
    assert!(matches!(err, ProtocolError::CrossHostBurnDown { .. }));
}

// =============================================================================
// ENCRYPTION POLICY
// =============================================================================

#[test]
fn test_sealed_add_key_with_rewrap() {
    let dir = Directory::new();
    let replica = HpkeKeyPair::generate();
    dir.peers
        .add_peer(Peer {
            hostname: "replica.example".into(),
            public_key: [7u8; 32],
            cosign: false,
            replicate: true,
            mirrored_root: None,
            mirrored_leaf_count: 0,
            rewrap: Some(RewrapConfig {
                hpke_public_key: replica.public.to_bytes(),
                ciphersuite: Ciphersuite::X25519Sha256Aes128Gcm,
            }),
        })
        .unwrap();

    let alice = keypair(1);
    let actor_key = AttributeKey::generate();
    let bundle = SignedBundle::new(
        Action::AddKey,
        object(json!({"actor": ALICE, "public-key": alice.public_key().to_b64()})),
        Some(dir.root()),
    )
    .encrypt_attribute("actor", &actor_key)
    .unwrap()
    .sign(&alice)
    .unwrap();

    let outcome = dir.submit_bundle(ALICE, bundle, SEALED).unwrap();
    assert_eq!(dir.trust.public_keys(ALICE).unwrap().len(), 1);

    let leaf = dir
        .service
        .log()
        .leaf_by_id(outcome.leaf_id)
        .unwrap()
        .unwrap();
    let contents = String::from_utf8(leaf.contents).unwrap();
    assert!(!contents.contains(ALICE));
    assert!(!contents.contains(&actor_key.to_b64()));

    let rewrapped = dir.peers.rewrapped_keys("replica.example", outcome.leaf_id).unwrap();
    assert_eq!(rewrapped.len(), 1);
    let opened = pkd_crypto::open(&replica.secret, &rewrapped[0].ciphertext).unwrap();
    assert_eq!(opened, actor_key.as_bytes().to_vec());
}

#[test]
fn test_relay_requires_sealed_messages() {
    let dir = Directory::new();
    let alice = keypair(1);
    let relay = Delivery {
        sealed: false,
        transport: Transport::ExternalRelay,
    };
    let err = dir
        .submit(
            Action::AddKey,
            json!({"actor": ALICE, "public-key": alice.public_key().to_b64()}),
            &alice,
            ALICE,
            relay,
        )
        .unwrap_err();
    assert_eq!(
        err,
        ProtocolError::EncryptionRequired {
            action: Action::AddKey
        }
    );

    let sealed_relay = Delivery {
        sealed: true,
        transport: Transport::ExternalRelay,
    };
    dir.submit(
        Action::AddKey,
        json!({"actor": ALICE, "public-key": alice.public_key().to_b64()}),
        &alice,
        ALICE,
        sealed_relay,
    )
    .unwrap();
}

#[test]
fn test_burn_down_rejected_over_relay_and_when_sealed() {
    let dir = Directory::new();
    let admin = keypair(2);
    dir.add_key(ADMIN, &admin, &admin).unwrap();
    let message = json!({"actor": ALICE, "operator": ADMIN});

    for sealed in [false, true] {
        let err = dir
            .submit(
                Action::BurnDown,
                message.clone(),
                &admin,
                ADMIN,
                Delivery {
                    sealed,
                    transport: Transport::ExternalRelay,
                },
            )
            .unwrap_err();
        assert!(matches!(err, ProtocolError::RelayForbidden { .. }));
    }

    let err = dir
        .submit(Action::BurnDown, message, &admin, ADMIN, SEALED)
        .unwrap_err();
    assert!(matches!(err, ProtocolError::PlaintextRequired { .. }));
}

#[test]
fn test_declared_context_must_match_payload() {
    let dir = Directory::new();
    let alice = keypair(1);
    let bundle = SignedBundle::new(
        Action::AddKey,
        object(json!({"actor": ALICE, "public-key": alice.public_key().to_b64()})),
        Some(dir.root()),
    )
    .sign(&alice)
    .unwrap();
    let blob = seal(
        &dir.hpke.public,
        Ciphersuite::default(),
        bundle.to_json().unwrap().as_bytes(),
    )
    .unwrap();

    let forged = Envelope::plaintext(ALICE, blob).to_json().unwrap();
    let err = dir.service.process(&forged, Transport::Direct).unwrap_err();
    assert!(matches!(err, ProtocolError::ContextMismatch { .. }));
    assert_eq!(dir.leaf_count(), 0);
}

#[test]
fn test_sealed_without_secret_is_unavailable() {
    let dir = Directory::new();
    let blind = ProtocolService::new(dir.service.log().clone(), None);
    let alice = keypair(1);
    let bundle = SignedBundle::new(
        Action::AddKey,
        object(json!({"actor": ALICE, "public-key": alice.public_key().to_b64()})),
        Some(dir.root()),
    )
    .sign(&alice)
    .unwrap();

    let err = blind
        .process(&dir.envelope(ALICE, &bundle, SEALED), Transport::Direct)
        .unwrap_err();
    assert_eq!(err, ProtocolError::DecryptionUnavailable);
    assert_eq!(err.class(), ErrorClass::StorageInvariant);
}

// =============================================================================
// ENVELOPE / RECENCY
// =============================================================================

#[test]
fn test_outer_actor_must_match_signer() {
    let dir = Directory::new();
    let alice = keypair(1);
    let err = dir
        .submit(
            Action::AddKey,
            json!({"actor": ALICE, "public-key": alice.public_key().to_b64()}),
            &alice,
            "https://a.example/users/mallory",
            PLAIN,
        )
        .unwrap_err();
    assert!(matches!(err, ProtocolError::ActorMismatch { .. }));
}

#[test]
fn test_unknown_root_rejected() {
    let dir = Directory::new();
    let alice = keypair(1);
    let bundle = SignedBundle::new(
        Action::AddKey,
        object(json!({"actor": ALICE, "public-key": alice.public_key().to_b64()})),
        Some(MerkleRoot::from_hash([0xAA; 32])),
    )
    .sign(&alice)
    .unwrap();
    let err = dir.submit_bundle(ALICE, bundle, PLAIN).unwrap_err();
    assert!(matches!(err, ProtocolError::Log(_)));
    assert_eq!(err.class(), ErrorClass::PolicyViolation);
}

#[test]
fn test_missing_root_rejected() {
    let dir = Directory::new();
    let alice = keypair(1);
    let bundle = SignedBundle::new(
        Action::AddKey,
        object(json!({"actor": ALICE, "public-key": alice.public_key().to_b64()})),
        None,
    )
    .sign(&alice)
    .unwrap();
    assert!(matches!(
        dir.submit_bundle(ALICE, bundle, PLAIN),
        Err(ProtocolError::InvalidBundle { .. })
    ));
}

#[test]
fn test_success_clears_write_challenge() {
    let dir = Directory::new();
    let log = dir.service.log();
    log.set_write_challenge("external-writer").unwrap();
    assert_eq!(log.write_challenge().unwrap().as_deref(), Some("external-writer"));

    let alice = keypair(1);
    dir.add_key(ALICE, &alice, &alice).unwrap();
    assert_eq!(log.write_challenge().unwrap(), None);
}

// =============================================================================
// CHECKPOINT
// =============================================================================

#[test]
fn test_checkpoint_from_registered_peer() {
    let dir = Directory::new();
    let peer_key = keypair(8);
    dir.peers
        .add_peer(Peer {
            hostname: "mirror.example".into(),
            public_key: *peer_key.public_key().as_bytes(),
            cosign: true,
            replicate: true,
            mirrored_root: None,
            mirrored_leaf_count: 0,
            rewrap: None,
        })
        .unwrap();
    let asserted = MerkleRoot::from_hash([4u8; 32]);
    let message = json!({
        "from-directory": "mirror.example",
        "from-root": asserted.encode(),
        "from-leaf-count": 42,
    });

    let outcome = dir
        .submit(Action::Checkpoint, message.clone(), &peer_key, "mirror.example", PLAIN)
        .unwrap();
    assert_eq!(
        outcome.result,
        ActionResult::CheckpointRecorded {
            peer: "mirror.example".into(),
            leaf_count: 42
        }
    );
    let peer = dir.peers.peer("mirror.example").unwrap().unwrap();
    assert_eq!(peer.mirrored_root, Some(asserted));

    let forged = dir
        .submit(Action::Checkpoint, message, &keypair(9), "mirror.example", PLAIN)
        .unwrap_err();
    assert!(matches!(forged, ProtocolError::InvalidSignature { .. }));
}

#[test]
fn test_checkpoint_from_stranger_rejected() {
    let dir = Directory::new();
    let err = dir
        .submit(
            Action::Checkpoint,
            json!({
                "from-directory": "stranger.example",
                "from-root": MerkleRoot::from_hash([4u8; 32]).encode(),
                "from-leaf-count": 1,
            }),
            &keypair(8),
            "stranger.example",
            PLAIN,
        )
        .unwrap_err();
    assert!(matches!(err, ProtocolError::UnknownPeer { .. }));
}

// =============================================================================
// AUX DATA
// =============================================================================

#[test]
fn test_add_and_revoke_aux_data() {
    let dir = Directory::new();
    let alice = keypair(1);
    dir.add_key(ALICE, &alice, &alice).unwrap();
    let message = json!({"actor": ALICE, "aux-type": "age-v1", "aux-data": "age1qqqq"});

    let added = dir
        .submit(Action::AddAuxData, message.clone(), &alice, ALICE, PLAIN)
        .unwrap();
    assert!(matches!(added.result, ActionResult::AuxDataAdded { .. }));
    assert_eq!(dir.trust.aux_data(ALICE).unwrap().len(), 1);

    let duplicate = dir
        .submit(Action::AddAuxData, message.clone(), &alice, ALICE, PLAIN)
        .unwrap_err();
    assert!(matches!(
        duplicate,
        ProtocolError::Trust(TrustStoreError::DuplicateAuxData { .. })
    ));

    dir.submit(Action::RevokeAuxData, message, &alice, ALICE, PLAIN)
        .unwrap();
    assert!(dir.trust.aux_data(ALICE).unwrap().is_empty());
}
