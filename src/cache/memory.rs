//! In-memory store
//!
//! Bounded by entry count; once full, writes of new keys fail with
//! `StorageFull`. Overwrites of existing keys always succeed.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::error::CacheError;
use super::traits::Store;

pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    max_entries: usize,
}

impl MemoryStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_MAX_MEMORY_ENTRIES)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn write(&self, key: &str, value: String) -> Result<(), CacheError> {
        let mut entries = self.entries.write();
        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            return Err(CacheError::StorageFull);
        }
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.write().remove(key).is_some())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        Ok(self
            .entries
            .read()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
