//! # Merkle Log Service
//!
//! Owns the single tree-state row. Writers serialize through one critical
//! section; readers go through a per-instance cache and never touch the
//! writer lock.

mod insert;
mod read;

use crate::adapters::{InMemoryKVStore, SystemTimeSource, TracingRecencyObserver};
use crate::domain::entities::{LogHead, MerkleLogConfig};
use crate::domain::tree::IncrementalTree;
use crate::ports::outbound::{KeyValueStore, RecencyObserver, TimeSource};
use lru::LruCache;
use parking_lot::Mutex;
use pkd_types::{LeafId, MerkleLeaf};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Dependencies for [`MerkleLog`].
pub struct MerkleLogDependencies {
    /// Shared transactional store.
    pub store: Arc<dyn KeyValueStore>,
    /// Clock.
    pub time_source: Arc<dyn TimeSource>,
    /// Hook for anomalous recency acceptances.
    pub observer: Arc<dyn RecencyObserver>,
}

impl MerkleLogDependencies {
    /// System clock and the tracing observer over `store`.
    pub fn with_store(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            time_source: Arc::new(SystemTimeSource),
            observer: Arc::new(TracingRecencyObserver),
        }
    }
}

pub(crate) struct ReadCache {
    head: Option<LogHead>,
    leaves: LruCache<LeafId, MerkleLeaf>,
}

impl ReadCache {
    fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            head: None,
            leaves: LruCache::new(capacity),
        }
    }
}

/// The append-only Merkle log.
///
/// One instance per store; share it behind an `Arc`.
pub struct MerkleLog {
    pub(crate) store: Arc<dyn KeyValueStore>,
    pub(crate) time_source: Arc<dyn TimeSource>,
    pub(crate) observer: Arc<dyn RecencyObserver>,
    pub(crate) config: MerkleLogConfig,
    pub(crate) writer: Mutex<()>,
    pub(crate) cache: Mutex<ReadCache>,
}

impl MerkleLog {
    /// Create the log over `deps.store`.
    pub fn new(deps: MerkleLogDependencies, config: MerkleLogConfig) -> Self {
        let cache = ReadCache::new(config.leaf_cache_size);
        Self {
            store: deps.store,
            time_source: deps.time_source,
            observer: deps.observer,
            config,
            writer: Mutex::new(()),
            cache: Mutex::new(cache),
        }
    }

    /// In-memory log with default settings.
    pub fn in_memory() -> Self {
        Self::new(
            MerkleLogDependencies::with_store(Arc::new(InMemoryKVStore::new())),
            MerkleLogConfig::default(),
        )
    }

    /// The shared store, for subsystems that keep their rows beside the log.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// The log's clock.
    pub fn time_source(&self) -> &Arc<dyn TimeSource> {
        &self.time_source
    }

    /// Active configuration.
    pub fn config(&self) -> &MerkleLogConfig {
        &self.config
    }

    /// Check a committed leaf's inclusion proof against its own root.
    pub fn verify_leaf(leaf: &MerkleLeaf) -> bool {
        IncrementalTree::verify_inclusion(
            &leaf.draft().canonical_bytes(),
            leaf.index(),
            leaf.id,
            &leaf.inclusion_proof,
            leaf.root.as_bytes(),
        )
    }
}
