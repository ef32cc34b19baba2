//! # Restart Durability
//!
//! A directory reopened over the same data directory serves the same log
//! and keeps accepting actions that cite roots from before the restart.

#[cfg(test)]
mod tests {
    use crate::fixtures::Client;
    use pkd_01_merkle_log::{MerkleLog, MerkleLogApi};
    use pkd_02_trust_store::TrustStoreApi;
    use pkd_03_protocol::{Action, ProtocolApi, Transport};
    use pkd_runtime::{DirectoryConfig, DirectoryContainer};
    use serde_json::json;

    const ALICE: &str = "https://social.example/users/alice";

    fn config(dir: &std::path::Path) -> DirectoryConfig {
        let mut config = DirectoryConfig::default();
        config.hostname = "pkd.example".into();
        config.storage.data_dir = Some(dir.to_path_buf());
        config
    }

    #[test]
    fn test_directory_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let alice = Client::new(ALICE, 1);
        let laptop = Client::new(ALICE, 2);

        let (root, stale_message) = {
            let pkd = DirectoryContainer::new(config(dir.path())).unwrap();
            pkd.protocol
                .process(&alice.add_own_key(&pkd.log), Transport::Direct)
                .unwrap();
            let root = pkd.log.latest_root().unwrap();
            // built now, submitted after the restart
            let message = alice
                .message(
                    &pkd.log,
                    Action::AddKey,
                    json!({"actor": ALICE, "public-key": laptop.public_key()}),
                )
                .plaintext();
            (root, message)
        };

        let pkd = DirectoryContainer::new(config(dir.path())).unwrap();
        assert_eq!(pkd.log.latest_root().unwrap(), root);
        assert_eq!(pkd.trust.public_keys(ALICE).unwrap().len(), 1);

        let outcome = pkd.protocol.process(&stale_message, Transport::Direct).unwrap();
        assert_eq!(outcome.leaf_id, 2);
        assert_eq!(pkd.trust.public_keys(ALICE).unwrap().len(), 2);

        for id in 1..=2 {
            let leaf = pkd.log.leaf_by_id(id).unwrap().unwrap();
            assert!(MerkleLog::verify_leaf(&leaf));
        }
    }

    #[test]
    fn test_rejected_action_leaves_disk_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let alice = Client::new(ALICE, 1);
        {
            let pkd = DirectoryContainer::new(config(dir.path())).unwrap();
            pkd.protocol
                .process(&alice.add_own_key(&pkd.log), Transport::Direct)
                .unwrap();
            // duplicate key: the transition fails after the leaf was staged
            let duplicate = alice.add_own_key(&pkd.log);
            assert!(pkd.protocol.process(&duplicate, Transport::Direct).is_err());
        }

        let pkd = DirectoryContainer::new(config(dir.path())).unwrap();
        assert_eq!(pkd.log.leaf_count().unwrap(), 1);
        assert_eq!(pkd.trust.key_history(ALICE).unwrap().len(), 1);
    }
}
