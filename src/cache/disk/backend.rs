//! Backend trait for filesystem operations

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::cache::CacheError;

/// Abstraction over filesystem operations used by the disk store
#[async_trait]
pub trait DiskBackend: Send + Sync {
    /// Read entire file contents
    async fn read_file(&self, path: &Path) -> Result<Bytes, CacheError>;

    /// Write file contents atomically (using temp file + rename)
    async fn write_file_atomic(&self, path: &Path, data: Bytes) -> Result<(), CacheError>;

    /// Delete a file. Returns false if it did not exist
    async fn delete_file(&self, path: &Path) -> Result<bool, CacheError>;

    /// List all files in a directory (empty if the directory is missing)
    async fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, CacheError>;
}
