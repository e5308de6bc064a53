//! TTL cache for lookup results
//!
//! - `Store`: persistent key-value backend (`MemoryStore`, `DiskStore`)
//! - `TtlCache`: expiry classes, stale reads, pruning on top of a store
//! - `CacheConfig`: the configuration surface for both

use std::sync::Arc;

pub mod config;
pub mod disk;
pub mod entry;
pub mod error;
pub mod memory;
pub mod stats;
pub mod traits;
pub mod ttl;

pub use config::{CacheConfig, StoreKind};
pub use disk::DiskStore;
pub use entry::{CacheEntry, TtlClass, TtlSettings};
pub use error::CacheError;
pub use memory::MemoryStore;
pub use stats::CacheStats;
pub use traits::Store;
pub use ttl::TtlCache;

/// Build the store selected by configuration
pub fn open_store(config: &CacheConfig) -> Arc<dyn Store> {
    match config.store {
        StoreKind::Memory => Arc::new(MemoryStore::new(config.max_memory_entries)),
        StoreKind::Disk => {
            let store = DiskStore::new(&config.dir);
            tracing::info!(dir = %store.dir().display(), "Using disk cache store");
            Arc::new(store)
        }
    }
}
