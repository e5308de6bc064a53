//! Cache statistics types
//!
//! - `CacheStats`: point-in-time snapshot (hits, misses, writes, errors, removals)
//! - `CacheStatsTracker`: lock-free counters behind the snapshot

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache statistics for monitoring and diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of fresh reads
    pub hits: u64,
    /// Number of reads that found nothing usable
    pub misses: u64,
    /// Number of entries written
    pub writes: u64,
    /// Storage-layer failures that were swallowed
    pub storage_errors: u64,
    /// Entries removed because they expired or were unreadable
    pub removals: u64,
}

impl CacheStats {
    /// Calculate hit rate (hits / total reads). Returns 0.0 with no reads.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Statistics tracker using atomics for thread safety
#[derive(Debug, Default)]
pub(crate) struct CacheStatsTracker {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    storage_errors: AtomicU64,
    removals: AtomicU64,
}

impl CacheStatsTracker {
    pub fn increment_hits(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_misses(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_writes(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_storage_errors(&self) {
        self.storage_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_removals(&self, count: u64) {
        self.removals.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            storage_errors: self.storage_errors.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
        }
    }
}
