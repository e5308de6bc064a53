//! Outbound Rate Limiting with Token Bucket Algorithm
//!
//! The availability API enforces a per-key request quota. Every upstream
//! attempt made by the batch fetcher first waits for a token, so bursts of
//! cache misses are smoothed instead of being rejected upstream.
//!
//! Uses the `governor` crate's token bucket:
//! - Fast (lock-free atomic operations)
//! - `until_ready` parks the task instead of failing the call
//!
//! ## Configuration Example
//!
//! ```yaml
//! rate_limit:
//!   enabled: true
//!   requests_per_second: 5
//!   burst: 5
//! ```

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Token bucket shared by every chunk sent to the lookup provider
#[derive(Clone)]
pub struct UpstreamRateLimiter {
    limiter: Arc<DirectLimiter>,
    requests_per_second: NonZeroU32,
}

impl std::fmt::Debug for UpstreamRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamRateLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}

impl UpstreamRateLimiter {
    /// Create a limiter; `None` when the rate is zero (unlimited)
    pub fn new(requests_per_second: u32, burst: u32) -> Option<Self> {
        let rps = NonZeroU32::new(requests_per_second)?;
        let burst = NonZeroU32::new(burst).unwrap_or(rps);
        let quota = Quota::per_second(rps).allow_burst(burst);

        Some(Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            requests_per_second: rps,
        })
    }

    /// Take a token without waiting
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Wait until a token is available
    pub async fn until_ready(&self) {
        if self.limiter.check().is_ok() {
            return;
        }
        tracing::debug!(
            requests_per_second = self.requests_per_second.get(),
            "Upstream rate limit reached, waiting for token"
        );
        self.limiter.until_ready().await;
    }

    pub fn requests_per_second(&self) -> u32 {
        self.requests_per_second.get()
    }
}
