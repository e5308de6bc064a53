//! Cache error types
//!
//! Storage-layer failures. The TTL cache swallows every one of these and
//! treats the operation as a miss; they only surface from the `Store` trait.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    /// Store quota exhausted
    #[error("cache storage is full")]
    StorageFull,

    /// I/O error (disk store)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry could not be encoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Entry exists but could not be decoded
    #[error("corrupt cache entry {key}: {reason}")]
    Corrupt { key: String, reason: String },
}
