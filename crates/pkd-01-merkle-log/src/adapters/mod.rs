//! # Adapters Module
//!
//! - `storage`: in-memory and file-backed `KeyValueStore`s
//! - `infra`: time sources and the default recency observer

pub mod infra;
pub mod storage;

pub use infra::{ManualTimeSource, SystemTimeSource, TracingRecencyObserver};
pub use storage::{FileBackedKVStore, InMemoryKVStore};
