//! Circuit breaker configuration for the availability API.
//!
//! While the circuit is open, upstream attempts fail immediately and keys go
//! to the fallback path. Default values are sourced from `crate::constants`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::constants::{
    DEFAULT_CB_TIMEOUT_SECS, DEFAULT_FAILURE_THRESHOLD, DEFAULT_HALF_OPEN_MAX_REQUESTS,
    DEFAULT_SUCCESS_THRESHOLD,
};

fn default_enabled() -> bool {
    true
}

fn default_failure_threshold() -> u32 {
    DEFAULT_FAILURE_THRESHOLD
}

fn default_success_threshold() -> u32 {
    DEFAULT_SUCCESS_THRESHOLD
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_CB_TIMEOUT_SECS
}

fn default_half_open_max_requests() -> u32 {
    DEFAULT_HALF_OPEN_MAX_REQUESTS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerSection {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Consecutive failed attempts that open the circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Successful probes needed to close it again
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
    /// Seconds to stay open before probing
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_half_open_max_requests")]
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerSection {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
            timeout_seconds: default_timeout_seconds(),
            half_open_max_requests: default_half_open_max_requests(),
        }
    }
}

impl CircuitBreakerSection {
    /// Breaker settings, or `None` when the breaker is disabled
    pub fn to_circuit_breaker_config(&self) -> Option<CircuitBreakerConfig> {
        self.enabled.then(|| CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            timeout_duration: Duration::from_secs(self.timeout_seconds),
            half_open_max_requests: self.half_open_max_requests,
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }
        if self.failure_threshold == 0 {
            return Err("circuit_breaker.failure_threshold must be greater than 0".to_string());
        }
        if self.success_threshold == 0 {
            return Err("circuit_breaker.success_threshold must be greater than 0".to_string());
        }
        if self.half_open_max_requests == 0 {
            return Err(
                "circuit_breaker.half_open_max_requests must be greater than 0".to_string(),
            );
        }
        Ok(())
    }
}
