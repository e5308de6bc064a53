//! Disk-based store
//!
//! One JSON file per storage key under a cache directory, written atomically
//! (temp file + rename) so a crash never leaves a half-written entry behind.
//! This is what lets the TTL cache survive process restarts.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::error::CacheError;
use super::traits::Store;

pub mod backend;
pub mod tokio_backend;

pub use self::backend::DiskBackend;
pub use self::tokio_backend::TokioFsBackend;


const ENTRY_EXTENSION: &str = "json";

/// Store that keeps each entry in its own file
pub struct DiskStore<B: DiskBackend = TokioFsBackend> {
    dir: PathBuf,
    backend: B,
}

impl DiskStore<TokioFsBackend> {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_backend(dir, TokioFsBackend)
    }
}

impl<B: DiskBackend> DiskStore<B> {
    pub fn with_backend(dir: impl Into<PathBuf>, backend: B) -> Self {
        Self {
            dir: dir.into(),
            backend,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", sanitize_file_stem(key), ENTRY_EXTENSION))
    }
}

/// Storage keys are already filename-safe; anything else is replaced.
fn sanitize_file_stem(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '-',
        })
        .collect()
}

#[async_trait]
impl<B: DiskBackend> Store for DiskStore<B> {
    async fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        let data = match self.backend.read_file(&self.path_for(key)).await {
            Ok(data) => data,
            Err(CacheError::Io(e)) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        String::from_utf8(data.to_vec())
            .map(Some)
            .map_err(|e| CacheError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn write(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.backend
            .write_file_atomic(&self.path_for(key), Bytes::from(value))
            .await
    }

    async fn remove(&self, key: &str) -> Result<bool, CacheError> {
        self.backend.delete_file(&self.path_for(key)).await
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let files = self.backend.read_dir(&self.dir).await?;
        Ok(files
            .iter()
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()))
            .filter(|stem| stem.starts_with(prefix))
            .map(str::to_string)
            .collect())
    }

    fn name(&self) -> &'static str {
        "disk"
    }
}
