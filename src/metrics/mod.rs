// Metrics module - Prometheus counters for lookups and upstream traffic
//
// Each service instance owns its own `Registry`, so several services (or
// tests) in one process never collide on metric names.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

use crate::availability::Provenance;

pub struct Metrics {
    registry: Registry,

    /// Resolved lookups by provenance (cache, api, stale, default)
    lookups: IntCounterVec,

    /// Callers that attached to an already pending key
    coalesced: IntCounter,

    /// Batch windows handed to the fetcher
    batches: IntCounter,

    /// Keys per dispatched batch window
    batch_size: Histogram,

    /// Upstream attempts (one per chunk attempt)
    upstream_calls: IntCounter,

    /// Failed upstream attempts by reason (transport, status, malformed,
    /// timeout, circuit_open)
    upstream_failures: IntCounterVec,

    /// Upstream latency in seconds
    upstream_duration: Histogram,

    /// Retry attempts scheduled after a failed or partial attempt
    retries: IntCounter,

    /// Keys that exhausted their retry budget
    exhausted: IntCounter,

    /// Keys currently waiting for a batch result
    pending: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("streamscout".to_string()), None)?;

        let lookups = IntCounterVec::new(
            Opts::new("lookups_total", "Resolved lookups by provenance"),
            &["provenance"],
        )?;
        let coalesced = IntCounter::new(
            "coalesced_requests_total",
            "Requests that attached to an in-flight lookup",
        )?;
        let batches = IntCounter::new("batches_total", "Batch windows dispatched")?;
        let batch_size = Histogram::with_opts(
            HistogramOpts::new("batch_size", "Keys per dispatched batch window")
                .buckets(vec![1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0]),
        )?;
        let upstream_calls = IntCounter::new(
            "upstream_calls_total",
            "Calls made to the lookup provider",
        )?;
        let upstream_failures = IntCounterVec::new(
            Opts::new(
                "upstream_failures_total",
                "Failed upstream attempts by reason",
            ),
            &["reason"],
        )?;
        let upstream_duration = Histogram::with_opts(
            HistogramOpts::new(
                "upstream_duration_seconds",
                "Duration of lookup provider calls in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        let retries = IntCounter::new("retries_total", "Upstream retry attempts")?;
        let exhausted = IntCounter::new(
            "exhausted_keys_total",
            "Keys that failed every upstream attempt",
        )?;
        let pending = IntGauge::new("pending_keys", "Keys waiting for a batch result")?;

        registry.register(Box::new(lookups.clone()))?;
        registry.register(Box::new(coalesced.clone()))?;
        registry.register(Box::new(batches.clone()))?;
        registry.register(Box::new(batch_size.clone()))?;
        registry.register(Box::new(upstream_calls.clone()))?;
        registry.register(Box::new(upstream_failures.clone()))?;
        registry.register(Box::new(upstream_duration.clone()))?;
        registry.register(Box::new(retries.clone()))?;
        registry.register(Box::new(exhausted.clone()))?;
        registry.register(Box::new(pending.clone()))?;

        Ok(Self {
            registry,
            lookups,
            coalesced,
            batches,
            batch_size,
            upstream_calls,
            upstream_failures,
            upstream_duration,
            retries,
            exhausted,
            pending,
        })
    }

    pub fn record_lookup(&self, provenance: Provenance) {
        self.lookups
            .with_label_values(&[provenance.as_str()])
            .inc();
    }

    pub fn record_coalesced(&self) {
        self.coalesced.inc();
    }

    pub fn record_batch(&self, keys: usize) {
        self.batches.inc();
        self.batch_size.observe(keys as f64);
    }

    pub fn record_upstream_call(&self, elapsed: Duration) {
        self.upstream_calls.inc();
        self.upstream_duration.observe(elapsed.as_secs_f64());
    }

    pub fn record_upstream_failure(&self, reason: &str) {
        self.upstream_failures.with_label_values(&[reason]).inc();
    }

    pub fn record_retry(&self) {
        self.retries.inc();
    }

    pub fn record_exhausted(&self, keys: usize) {
        self.exhausted.inc_by(keys as u64);
    }

    pub fn set_pending(&self, keys: usize) {
        self.pending.set(keys as i64);
    }

    pub fn lookups(&self, provenance: Provenance) -> u64 {
        self.lookups
            .with_label_values(&[provenance.as_str()])
            .get()
    }

    pub fn coalesced(&self) -> u64 {
        self.coalesced.get()
    }

    pub fn batches(&self) -> u64 {
        self.batches.get()
    }

    pub fn upstream_calls(&self) -> u64 {
        self.upstream_calls.get()
    }

    pub fn upstream_failures(&self, reason: &str) -> u64 {
        self.upstream_failures.with_label_values(&[reason]).get()
    }

    pub fn retries(&self) -> u64 {
        self.retries.get()
    }

    pub fn exhausted(&self) -> u64 {
        self.exhausted.get()
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("upstream_calls", &self.upstream_calls())
            .field("batches", &self.batches())
            .finish()
    }
}
