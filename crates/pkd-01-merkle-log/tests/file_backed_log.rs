//! File-backed store behind a real Merkle Log.

use pkd_01_merkle_log::{
    FileBackedKVStore, KVStoreError, KeyValueStore, MerkleLog, MerkleLogApi, MerkleLogConfig,
    MerkleLogDependencies, NoTransition,
};
use pkd_types::LeafDraft;
use std::io::Write;
use std::sync::Arc;

fn draft(i: u32) -> LeafDraft {
    LeafDraft::new(
        format!("record {i}").into_bytes(),
        [0u8; 64],
        &[2u8; 32],
        1_700_000_000 + i as u64,
    )
}

fn open_log(path: &std::path::Path) -> MerkleLog {
    let store = FileBackedKVStore::open(path).unwrap();
    MerkleLog::new(
        MerkleLogDependencies::with_store(Arc::new(store)),
        MerkleLogConfig::default(),
    )
}

#[test]
fn test_log_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pkd.db");

    let (root, proofs) = {
        let log = open_log(&path);
        let leaves: Vec<_> = (0..7)
            .map(|i| log.insert_leaf(draft(i), &mut NoTransition).unwrap())
            .collect();
        (
            log.latest_root().unwrap(),
            leaves.iter().map(|l| l.inclusion_proof.clone()).collect::<Vec<_>>(),
        )
    };

    let log = open_log(&path);
    assert_eq!(log.latest_root().unwrap(), root);
    assert_eq!(log.leaf_count().unwrap(), 7);
    for (i, proof) in proofs.iter().enumerate() {
        let leaf = log.leaf_by_id(i as u64 + 1).unwrap().unwrap();
        assert_eq!(&leaf.inclusion_proof, proof);
        assert!(MerkleLog::verify_leaf(&leaf));
    }

    let next = log.insert_leaf(draft(99), &mut NoTransition).unwrap();
    assert_eq!(next.id, 8);
    assert!(MerkleLog::verify_leaf(&next));
}

#[test]
fn test_missing_file_is_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileBackedKVStore::open(dir.path().join("absent.db")).unwrap();
    assert!(store.prefix_scan(b"").unwrap().is_empty());
}

#[test]
fn test_second_opener_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pkd.db");

    let first = FileBackedKVStore::open(&path).unwrap();
    first.put(b"l:first", b"1").unwrap();

    let second = FileBackedKVStore::open(&path);
    assert!(matches!(second, Err(KVStoreError::AlreadyLocked { .. })));

    first.put(b"l:later", b"2").unwrap();
    drop(first);

    let reopened = FileBackedKVStore::open(&path).unwrap();
    assert_eq!(reopened.get(b"l:first").unwrap(), Some(b"1".to_vec()));
    assert_eq!(reopened.get(b"l:later").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn test_writes_append_only_what_changed() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileBackedKVStore::open(dir.path().join("pkd.db")).unwrap();

    store.put(b"big", &[7u8; 64 * 1024]).unwrap();
    let after_big = store.journal_len();
    store.put(b"small", b"x").unwrap();
    let growth = store.journal_len() - after_big;

    // header + tag + two length-prefixed fields
    assert_eq!(growth, 8 + 1 + 4 + 5 + 4 + 1);
}

#[test]
fn test_reopen_compacts_journal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pkd.db");
    {
        let store = FileBackedKVStore::open(&path).unwrap();
        for i in 0..50u8 {
            store.put(b"counter", &[i]).unwrap();
        }
        store.delete(b"counter").unwrap();
        store.put(b"kept", b"v").unwrap();
    }

    let store = FileBackedKVStore::open(&path).unwrap();
    assert_eq!(store.get(b"counter").unwrap(), None);
    assert_eq!(store.get(b"kept").unwrap(), Some(b"v".to_vec()));
    assert_eq!(store.journal_len(), 8 + 1 + 4 + 4 + 4 + 1);
}

#[test]
fn test_torn_tail_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pkd.db");
    {
        let store = FileBackedKVStore::open(&path).unwrap();
        store.put(b"a", b"1").unwrap();
        store.put(b"b", b"2").unwrap();
    }
    // a record header promising more bytes than were written
    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&[200, 0, 0, 0, 1, 2, 3, 4, 1]).unwrap();
    drop(file);

    let store = FileBackedKVStore::open(&path).unwrap();
    assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
    store.put(b"c", b"3").unwrap();
    drop(store);

    let store = FileBackedKVStore::open(&path).unwrap();
    assert_eq!(store.get(b"c").unwrap(), Some(b"3".to_vec()));
}

#[test]
fn test_damaged_record_is_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.db");
    {
        let store = FileBackedKVStore::open(&path).unwrap();
        store.put(b"a", b"1").unwrap();
        store.put(b"b", b"2").unwrap();
    }
    let mut bytes = std::fs::read(&path).unwrap();
    bytes[9] ^= 0xff;
    std::fs::write(&path, bytes).unwrap();

    assert!(matches!(
        FileBackedKVStore::open(&path),
        Err(KVStoreError::CorruptionError { .. })
    ));
}
