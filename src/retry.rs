//! Retry budget for upstream lookups
//!
//! A chunk that fails, or the ids a provider leaves out of its answer, are
//! tried again after an exponentially growing pause:
//!
//! | attempt | pause before it                     |
//! |---------|-------------------------------------|
//! | 1       | none                                |
//! | 2       | `initial_backoff`                   |
//! | n       | `initial_backoff * 2^(n-2)`, capped |
//!
//! ```yaml
//! retry:
//!   max_attempts: 3
//!   initial_backoff_ms: 250
//!   max_backoff_ms: 4000
//! ```

use std::time::Duration;

use crate::constants::{DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF_MS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per key, the first one included
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            DEFAULT_INITIAL_BACKOFF_MS,
            DEFAULT_MAX_BACKOFF_MS,
        )
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        }
    }

    /// Pause before the 0-based `attempt`
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.checked_pow(attempt - 1).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(Duration::MAX)
            .min(self.max_backoff)
    }

    /// Whether the 0-based `attempt` may be followed by another
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt.saturating_add(1) < self.max_attempts
    }

    /// Pauses before each retry, in order; empty for a single-attempt budget
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..self.max_attempts).map(|attempt| self.backoff_duration(attempt))
    }

    /// Worst-case time spent sleeping between attempts
    pub fn total_backoff(&self) -> Duration {
        self.schedule()
            .fold(Duration::ZERO, |total, pause| total.saturating_add(pause))
    }
}
