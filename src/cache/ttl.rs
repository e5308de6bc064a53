//! TTL cache over a `Store`
//!
//! Entries are JSON `CacheEntry` values under
//! `"{prefix}_{subjectId}_{region}_{version}"`. Non-empty results live for
//! `ttl_with_data`, empty ones for `ttl_empty`. Expired entries are misses for
//! `get` but stay readable through `get_stale` until `stale_retention` has
//! also passed, after which reads and `prune` delete them.
//!
//! Every storage failure is logged and swallowed; a broken store behaves
//! like an empty one.

use std::sync::Arc;
use tokio::sync::Mutex;

use super::config::CacheConfig;
use super::entry::{now_millis, parse_storage_key, storage_key, CacheEntry, TtlSettings};
use super::error::CacheError;
use super::stats::{CacheStats, CacheStatsTracker};
use super::traits::Store;
use crate::availability::{LookupKey, LookupResult};

pub struct TtlCache {
    store: Arc<dyn Store>,
    prefix: String,
    version: String,
    ttls: TtlSettings,
    /// Serializes mutations (set, opportunistic removal, prune)
    write_lock: Mutex<()>,
    stats: CacheStatsTracker,
}

impl TtlCache {
    pub fn new(store: Arc<dyn Store>, config: &CacheConfig) -> Self {
        Self {
            store,
            prefix: config.prefix.clone(),
            version: config.version.clone(),
            ttls: config.ttl_settings(),
            write_lock: Mutex::new(()),
            stats: CacheStatsTracker::default(),
        }
    }

    /// Storage key for a lookup key under this cache's prefix and version
    pub fn storage_key(&self, key: &LookupKey) -> String {
        storage_key(&self.prefix, key, &self.version)
    }

    pub fn ttl_settings(&self) -> &TtlSettings {
        &self.ttls
    }

    /// Fresh result for `key`, or `None` on miss / expiry / storage error
    pub async fn get(&self, key: &LookupKey) -> Option<LookupResult> {
        self.get_at(key, now_millis()).await
    }

    pub(crate) async fn get_at(&self, key: &LookupKey, now_ms: u64) -> Option<LookupResult> {
        let storage_key = self.storage_key(key);

        let Some(entry) = self.read_entry(&storage_key).await else {
            self.stats.increment_misses();
            return None;
        };

        if !entry.is_expired(now_ms, &self.ttls) {
            self.stats.increment_hits();
            return Some(entry.result);
        }

        self.stats.increment_misses();
        if entry.is_discardable(now_ms, &self.ttls) {
            self.discard_if_doomed(&storage_key, now_ms).await;
        }
        None
    }

    /// Present entry for `key` regardless of expiry (fallback path only)
    pub async fn get_stale(&self, key: &LookupKey) -> Option<CacheEntry> {
        self.read_entry(&self.storage_key(key)).await
    }

    /// Store `result`, classifying it by emptiness
    pub async fn set(&self, key: &LookupKey, result: LookupResult) {
        self.set_at(key, result, now_millis()).await
    }

    pub(crate) async fn set_at(&self, key: &LookupKey, result: LookupResult, now_ms: u64) {
        let storage_key = self.storage_key(key);
        let entry = CacheEntry::new_at(result, now_ms);

        let encoded = match serde_json::to_string(&entry) {
            Ok(encoded) => encoded,
            Err(e) => {
                self.record_storage_error(&storage_key, &CacheError::from(e));
                return;
            }
        };

        let _guard = self.write_lock.lock().await;
        match self.store.write(&storage_key, encoded).await {
            Ok(()) => {
                self.stats.increment_writes();
                tracing::trace!(
                    key = %key,
                    has_data = entry.has_data(),
                    "Cached lookup result"
                );
            }
            Err(e) => self.record_storage_error(&storage_key, &e),
        }
    }

    /// Remove entries past the stale horizon, unreadable entries, and entries
    /// written under another cache version. Returns the number removed.
    pub async fn prune(&self) -> usize {
        self.prune_at(now_millis()).await
    }

    pub(crate) async fn prune_at(&self, now_ms: u64) -> usize {
        let key_prefix = format!("{}_", self.prefix);
        let keys = match self.store.keys(&key_prefix).await {
            Ok(keys) => keys,
            Err(e) => {
                self.record_storage_error(&key_prefix, &e);
                return 0;
            }
        };

        let mut obsolete = Vec::new();
        let mut expired = Vec::new();
        for storage_key in keys {
            let Some((_, _, version)) = parse_storage_key(&self.prefix, &storage_key) else {
                continue;
            };
            if version != self.version {
                obsolete.push(storage_key);
                continue;
            }
            match self.decode(&storage_key).await {
                Ok(Some(entry)) if !entry.is_discardable(now_ms, &self.ttls) => {}
                Ok(None) => {}
                _ => expired.push(storage_key),
            }
        }

        let _guard = self.write_lock.lock().await;
        let mut removed = 0;
        for storage_key in &obsolete {
            if self.remove_locked(storage_key).await {
                removed += 1;
            }
        }
        // Re-checked under the lock: a write since the scan keeps its entry
        for storage_key in &expired {
            if self.remove_if_doomed_locked(storage_key, now_ms).await {
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(removed = removed, store = self.store.name(), "Pruned cache entries");
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    async fn decode(&self, storage_key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let Some(raw) = self.store.read(storage_key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CacheError::Corrupt {
                key: storage_key.to_string(),
                reason: e.to_string(),
            })
    }

    /// Decode an entry, treating any failure as absent. Corrupt entries are
    /// removed so they do not keep failing.
    async fn read_entry(&self, storage_key: &str) -> Option<CacheEntry> {
        match self.decode(storage_key).await {
            Ok(entry) => entry,
            Err(e) => {
                self.record_storage_error(storage_key, &e);
                if matches!(e, CacheError::Corrupt { .. }) {
                    self.discard_if_doomed(storage_key, now_millis()).await;
                }
                None
            }
        }
    }

    /// Remove an entry found expired or corrupt by an unlocked read, unless
    /// it was rewritten in the meantime. Returns whether it was removed.
    pub(crate) async fn discard_if_doomed(&self, storage_key: &str, now_ms: u64) -> bool {
        let _guard = self.write_lock.lock().await;
        self.remove_if_doomed_locked(storage_key, now_ms).await
    }

    /// Caller holds `write_lock`
    async fn remove_if_doomed_locked(&self, storage_key: &str, now_ms: u64) -> bool {
        let doomed = match self.decode(storage_key).await {
            Ok(Some(entry)) => entry.is_discardable(now_ms, &self.ttls),
            Ok(None) => false,
            Err(CacheError::Corrupt { .. }) => true,
            Err(e) => {
                self.record_storage_error(storage_key, &e);
                false
            }
        };
        doomed && self.remove_locked(storage_key).await
    }

    /// Caller holds `write_lock`
    async fn remove_locked(&self, storage_key: &str) -> bool {
        match self.store.remove(storage_key).await {
            Ok(true) => {
                self.stats.add_removals(1);
                true
            }
            Ok(false) => false,
            Err(e) => {
                self.record_storage_error(storage_key, &e);
                false
            }
        }
    }

    fn record_storage_error(&self, storage_key: &str, error: &CacheError) {
        self.stats.increment_storage_errors();
        tracing::warn!(
            key = %storage_key,
            store = self.store.name(),
            error = %error,
            "Cache storage error, treating as miss"
        );
    }
}
