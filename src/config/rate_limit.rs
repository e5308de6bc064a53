//! Outbound rate limit configuration.
//!
//! Caps how fast the batch fetcher calls the availability API. Disabled by
//! default; a rate of 0 also means unlimited.

use serde::{Deserialize, Serialize};

use crate::rate_limit::UpstreamRateLimiter;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Upstream calls per second
    #[serde(default)]
    pub requests_per_second: u32,
    /// Calls allowed back to back (defaults to `requests_per_second`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burst: Option<u32>,
}

impl RateLimitConfig {
    pub fn build_limiter(&self) -> Option<UpstreamRateLimiter> {
        if !self.enabled {
            return None;
        }
        UpstreamRateLimiter::new(
            self.requests_per_second,
            self.burst.unwrap_or(self.requests_per_second),
        )
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.enabled && self.requests_per_second == 0 {
            return Err(
                "rate_limit.requests_per_second must be greater than 0 when enabled".to_string(),
            );
        }
        if self.burst == Some(0) {
            return Err("rate_limit.burst must be greater than 0".to_string());
        }
        Ok(())
    }
}
