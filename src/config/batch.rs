//! Batch fetcher configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_CONCURRENCY, DEFAULT_REQUEST_TIMEOUT_MS};

fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum subject ids per upstream call
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Chunks in flight at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Bound on a single upstream attempt
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            max_concurrency: default_max_concurrency(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl BatchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_batch_size == 0 {
            return Err("batch.max_batch_size must be greater than 0".to_string());
        }
        if self.max_concurrency == 0 {
            return Err("batch.max_concurrency must be greater than 0".to_string());
        }
        if self.request_timeout_ms == 0 {
            return Err("batch.request_timeout_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}
