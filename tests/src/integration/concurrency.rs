//! # Concurrent Writers
//!
//! Many submitters against one log: every accepted action gets its own leaf
//! id, ids are dense, and every stored proof checks out against its root.

#[cfg(test)]
mod tests {
    use crate::fixtures::Client;
    use pkd_01_merkle_log::{MerkleLog, MerkleLogApi};
    use pkd_02_trust_store::TrustStoreApi;
    use pkd_03_protocol::{Action, ProtocolApi, Transport};
    use pkd_runtime::{DirectoryConfig, DirectoryContainer};
    use serde_json::json;
    use std::collections::BTreeSet;

    const WRITERS: u8 = 6;

    #[test]
    fn test_parallel_submitters_get_distinct_leaves() {
        let pkd = DirectoryContainer::new(DirectoryConfig::default()).unwrap();

        let leaf_ids: Vec<u64> = std::thread::scope(|s| {
            let handles: Vec<_> = (1..=WRITERS)
                .map(|seed| {
                    let pkd = &pkd;
                    s.spawn(move || {
                        let actor = format!("https://social.example/users/w{seed}");
                        let client = Client::new(&actor, seed);
                        let first = pkd
                            .protocol
                            .process(&client.add_own_key(&pkd.log), Transport::Direct)
                            .unwrap();
                        let fireproof = client
                            .message(&pkd.log, Action::Fireproof, json!({"actor": actor}))
                            .plaintext();
                        let second = pkd
                            .protocol
                            .process(&fireproof, Transport::Direct)
                            .unwrap();
                        vec![first.leaf_id, second.leaf_id]
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        let unique: BTreeSet<u64> = leaf_ids.iter().copied().collect();
        let expected: BTreeSet<u64> = (1..=2 * WRITERS as u64).collect();
        assert_eq!(unique, expected);
        assert_eq!(pkd.log.leaf_count().unwrap(), 2 * WRITERS as u64);

        for id in expected {
            let leaf = pkd.log.leaf_by_id(id).unwrap().unwrap();
            assert!(MerkleLog::verify_leaf(&leaf), "leaf {id} proof");
        }
        for seed in 1..=WRITERS {
            let actor = format!("https://social.example/users/w{seed}");
            assert!(pkd.trust.actor(&actor).unwrap().unwrap().fireproof);
        }
    }
}
