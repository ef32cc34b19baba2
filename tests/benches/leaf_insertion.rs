//! # Leaf Insertion Benchmarks
//!
//! | Path | What is measured |
//! |------|------------------|
//! | `insert_leaf` | tree append + proof + atomic batch, no side effect |
//! | `process_add_key` | full protocol pipeline for a bootstrap AddKey |
//! | `assert_recent_merkle_root` | recency check on a populated log |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pkd_01_merkle_log::{MerkleLog, MerkleLogApi, NoTransition};
use pkd_03_protocol::{ProtocolApi, ProtocolService, Transport};
use pkd_tests::fixtures::Client;
use pkd_types::LeafDraft;
use std::sync::Arc;
use std::time::Duration;

fn draft(i: u64) -> LeafDraft {
    LeafDraft::new(
        format!("bench record {i}").into_bytes(),
        [7u8; 64],
        &[1u8; 32],
        1_700_000_000 + i,
    )
}

fn populated(size: u64) -> MerkleLog {
    let log = MerkleLog::in_memory();
    for i in 0..size {
        log.insert_leaf(draft(i), &mut NoTransition)
            .expect("insert");
    }
    log
}

fn bench_insert_leaf(c: &mut Criterion) {
    let mut group = c.benchmark_group("pkd-01-merkle-log");
    group.measurement_time(Duration::from_secs(10));
    group.throughput(Throughput::Elements(1));

    for size in [0u64, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("insert_leaf", size), &size, |b, &size| {
            let log = populated(size);
            let mut i = size;
            b.iter(|| {
                i += 1;
                black_box(log.insert_leaf(draft(i), &mut NoTransition).expect("insert"))
            })
        });
    }

    let log = populated(1_000);
    let recent = log.latest_root().expect("root");
    group.bench_function("assert_recent_merkle_root", |b| {
        b.iter(|| black_box(log.assert_recent_merkle_root(&recent).is_ok()))
    });

    group.finish();
}

fn bench_process_add_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("pkd-03-protocol");
    group.throughput(Throughput::Elements(1));

    group.bench_function("process_add_key", |b| {
        let log = Arc::new(MerkleLog::in_memory());
        let service = ProtocolService::new(log.clone(), None);
        let mut n = 0u32;
        b.iter(|| {
            n += 1;
            let seed = n.to_le_bytes();
            let client = Client::new(&format!("https://bench.example/u/{n}"), seed[0] ^ seed[1]);
            let envelope = client.add_own_key(&log);
            black_box(service.process(&envelope, Transport::Direct).is_ok())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_insert_leaf, bench_process_add_key);
criterion_main!(benches);
