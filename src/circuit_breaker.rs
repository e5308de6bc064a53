//! Upstream circuit breaker
//!
//! Once the availability API has failed `failure_threshold` times in a row
//! the circuit opens and attempts are refused without touching the network,
//! so lookups drop straight to the fallback path. After `timeout_duration`
//! a few probe calls are let through (half-open); enough successful probes
//! close the circuit again, one failed probe reopens it.
//!
//! Every admitted call holds a `CallPermit` and reports its outcome through
//! it. A permit dropped without a verdict gives its probe slot back.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::constants::{
    DEFAULT_CB_TIMEOUT_SECS, DEFAULT_FAILURE_THRESHOLD, DEFAULT_HALF_OPEN_MAX_REQUESTS,
    DEFAULT_SUCCESS_THRESHOLD,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failed calls that open the circuit
    pub failure_threshold: u32,
    /// Successful probes that close a half-open circuit
    pub success_threshold: u32,
    /// Time spent open before probing
    pub timeout_duration: Duration,
    /// Probe calls allowed in flight while half-open
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            timeout_duration: Duration::from_secs(DEFAULT_CB_TIMEOUT_SECS),
            half_open_max_requests: DEFAULT_HALF_OPEN_MAX_REQUESTS,
        }
    }
}

/// Shared, lock-free breaker; clones observe the same circuit
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: CircuitBreakerConfig,
    /// Monotonic origin for `opened_at_ms`
    origin: Instant,
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    probe_successes: AtomicU32,
    probes_in_flight: AtomicU32,
    opened_at_ms: AtomicU64,
}

/// Admission for one upstream call
///
/// Report the outcome with `succeeded` or `failed`.
#[derive(Debug)]
#[must_use = "report the call outcome through the permit"]
pub struct CallPermit {
    breaker: CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                origin: Instant::now(),
                state: AtomicU8::new(CircuitState::Closed as u8),
                consecutive_failures: AtomicU32::new(0),
                probe_successes: AtomicU32::new(0),
                probes_in_flight: AtomicU32::new(0),
                opened_at_ms: AtomicU64::new(0),
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.state.load(Ordering::Acquire).into()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Admit one upstream call, or `None` while the circuit refuses traffic
    pub fn try_acquire(&self) -> Option<CallPermit> {
        match self.state() {
            CircuitState::Closed => Some(self.permit(false)),
            CircuitState::Open => {
                let opened_at = self.inner.opened_at_ms.load(Ordering::Acquire);
                let open_for = self.elapsed_ms().saturating_sub(opened_at);
                if u128::from(open_for) < self.inner.config.timeout_duration.as_millis() {
                    return None;
                }
                self.half_open();
                self.take_probe()
            }
            CircuitState::HalfOpen => self.take_probe(),
        }
    }

    fn permit(&self, probe: bool) -> CallPermit {
        CallPermit {
            breaker: self.clone(),
            probe,
            settled: false,
        }
    }

    fn take_probe(&self) -> Option<CallPermit> {
        let max = self.inner.config.half_open_max_requests;
        self.inner
            .probes_in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            })
            .ok()
            .map(|_| self.permit(true))
    }

    fn release_probe(&self) {
        let _ = self
            .inner
            .probes_in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    fn on_success(&self, probe: bool) {
        if !probe {
            self.inner.consecutive_failures.store(0, Ordering::Relaxed);
            return;
        }
        self.release_probe();
        if self.state() != CircuitState::HalfOpen {
            return;
        }
        let successes = self.inner.probe_successes.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(
            successes = successes,
            threshold = self.inner.config.success_threshold,
            "Upstream probe succeeded"
        );
        if successes >= self.inner.config.success_threshold {
            self.close();
        }
    }

    fn on_failure(&self, probe: bool) {
        if probe {
            self.release_probe();
            if self.state() == CircuitState::HalfOpen {
                tracing::warn!("Upstream probe failed, reopening circuit");
                self.open();
            }
            return;
        }
        if self.state() != CircuitState::Closed {
            return;
        }
        let failures = self.inner.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if failures >= self.inner.config.failure_threshold {
            tracing::error!(failures = failures, "Upstream circuit opened");
            self.open();
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.inner.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn open(&self) {
        self.inner.probe_successes.store(0, Ordering::Relaxed);
        self.inner.probes_in_flight.store(0, Ordering::Relaxed);
        self.inner
            .opened_at_ms
            .store(self.elapsed_ms(), Ordering::Release);
        self.set_state(CircuitState::Open);
    }

    fn half_open(&self) {
        let swapped = self.inner.state.compare_exchange(
            CircuitState::Open as u8,
            CircuitState::HalfOpen as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if swapped.is_ok() {
            self.inner.probe_successes.store(0, Ordering::Relaxed);
            self.inner.probes_in_flight.store(0, Ordering::Relaxed);
            tracing::info!("Upstream circuit half-open, probing");
        }
    }

    fn close(&self) {
        self.inner.consecutive_failures.store(0, Ordering::Relaxed);
        self.inner.probe_successes.store(0, Ordering::Relaxed);
        self.inner.probes_in_flight.store(0, Ordering::Relaxed);
        self.set_state(CircuitState::Closed);
        tracing::info!("Upstream circuit closed");
    }

    fn set_state(&self, state: CircuitState) {
        self.inner.state.store(state as u8, Ordering::Release);
    }
}

impl CallPermit {
    pub fn succeeded(mut self) {
        self.settled = true;
        self.breaker.on_success(self.probe);
    }

    pub fn failed(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.probe);
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            self.breaker.release_probe();
        }
    }
}
