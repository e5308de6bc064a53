//! Coalescing configuration types.
//!
//! Controls the batch window: how long the coalescer collects misses before
//! handing them to the batch fetcher, and how many keys force an early
//! dispatch.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{DEFAULT_BATCH_WINDOW_MS, DEFAULT_MAX_QUEUE};

fn default_window_ms() -> u64 {
    DEFAULT_BATCH_WINDOW_MS
}

fn default_max_queue() -> usize {
    DEFAULT_MAX_QUEUE
}

/// Request coalescing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoalescingConfig {
    /// Batch window in milliseconds (default: 50)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    /// Queue length that dispatches the window early (default: 200)
    #[serde(default = "default_max_queue")]
    pub max_queue: usize,
}

impl Default for CoalescingConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            max_queue: default_max_queue(),
        }
    }
}

impl CoalescingConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_queue == 0 {
            return Err("coalescing.max_queue must be greater than 0".to_string());
        }
        Ok(())
    }
}
