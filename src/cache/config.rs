//! Cache configuration types.
//!
//! One surface for everything the TTL cache needs: key layout (prefix +
//! version token), TTL per class, stale retention, and the store backend.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::entry::TtlSettings;
use crate::constants::{
    DEFAULT_CACHE_DIR, DEFAULT_CACHE_PREFIX, DEFAULT_CACHE_VERSION, DEFAULT_MAX_MEMORY_ENTRIES,
    DEFAULT_STALE_RETENTION_SECS, DEFAULT_TTL_EMPTY_SECS, DEFAULT_TTL_WITH_DATA_SECS,
};

/// Which `Store` backs the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Process memory (lost on restart)
    Memory,
    /// One JSON file per entry under `dir`
    #[default]
    Disk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_ttl_with_data_secs")]
    pub ttl_with_data_secs: u64,
    #[serde(default = "default_ttl_empty_secs")]
    pub ttl_empty_secs: u64,
    #[serde(default = "default_stale_retention_secs")]
    pub stale_retention_secs: u64,
    #[serde(default)]
    pub store: StoreKind,
    #[serde(default = "default_cache_dir")]
    pub dir: String,
    #[serde(default = "default_max_memory_entries")]
    pub max_memory_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            version: default_version(),
            ttl_with_data_secs: default_ttl_with_data_secs(),
            ttl_empty_secs: default_ttl_empty_secs(),
            stale_retention_secs: default_stale_retention_secs(),
            store: StoreKind::default(),
            dir: default_cache_dir(),
            max_memory_entries: default_max_memory_entries(),
        }
    }
}

fn default_prefix() -> String {
    DEFAULT_CACHE_PREFIX.to_string()
}

fn default_version() -> String {
    DEFAULT_CACHE_VERSION.to_string()
}

fn default_ttl_with_data_secs() -> u64 {
    DEFAULT_TTL_WITH_DATA_SECS
}

fn default_ttl_empty_secs() -> u64 {
    DEFAULT_TTL_EMPTY_SECS
}

fn default_stale_retention_secs() -> u64 {
    DEFAULT_STALE_RETENTION_SECS
}

fn default_cache_dir() -> String {
    DEFAULT_CACHE_DIR.to_string()
}

fn default_max_memory_entries() -> usize {
    DEFAULT_MAX_MEMORY_ENTRIES
}

impl CacheConfig {
    pub fn ttl_settings(&self) -> TtlSettings {
        TtlSettings {
            with_data: Duration::from_secs(self.ttl_with_data_secs),
            empty: Duration::from_secs(self.ttl_empty_secs),
            stale_retention: Duration::from_secs(self.stale_retention_secs),
        }
    }

    /// Validate cache configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.prefix.is_empty() {
            return Err("cache.prefix cannot be empty".to_string());
        }
        if self.version.is_empty() {
            return Err("cache.version cannot be empty".to_string());
        }
        if self.ttl_with_data_secs == 0 {
            return Err("cache.ttl_with_data_secs must be greater than 0".to_string());
        }
        if self.ttl_empty_secs > self.ttl_with_data_secs {
            return Err(format!(
                "cache.ttl_empty_secs ({}) cannot be greater than cache.ttl_with_data_secs ({})",
                self.ttl_empty_secs, self.ttl_with_data_secs
            ));
        }
        if self.store == StoreKind::Disk && self.dir.is_empty() {
            return Err("cache.dir cannot be empty when the disk store is used".to_string());
        }
        if self.store == StoreKind::Memory && self.max_memory_entries == 0 {
            return Err("cache.max_memory_entries must be greater than 0".to_string());
        }
        Ok(())
    }
}
