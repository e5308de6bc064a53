//! Store trait definition
//!
//! The TTL cache persists entries through a `Store`: a flat string key-value
//! space that outlives the process (disk) or at least the cache instance
//! (memory, shared through `Arc`). Stores know nothing about expiry.

use async_trait::async_trait;

use super::error::CacheError;

/// Key-value backend for the TTL cache
#[async_trait]
pub trait Store: Send + Sync {
    /// Read a raw value, `None` if absent
    async fn read(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Write a raw value, overwriting any existing one
    async fn write(&self, key: &str, value: String) -> Result<(), CacheError>;

    /// Remove a value. Returns true if something was removed
    async fn remove(&self, key: &str) -> Result<bool, CacheError>;

    /// List all keys starting with `prefix`
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}
