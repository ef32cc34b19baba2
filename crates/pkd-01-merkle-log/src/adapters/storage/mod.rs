//! Storage Adapters
//!
//! Implementations of the `KeyValueStore` trait.

mod file;
mod lock;
mod memory;

pub use file::FileBackedKVStore;
pub use lock::StoreLock;
pub use memory::InMemoryKVStore;
