//! Availability service
//!
//! The one object callers hold. It owns the cache, fetcher, coalescer,
//! fallback policy and metrics for one configuration, and resolves every
//! lookup to a `Resolved` value: errors are absorbed by the fallback policy.

use futures::future::join_all;
use std::sync::Arc;

use crate::availability::{LookupKey, LookupResult, Provenance, Resolved};
use crate::cache::{open_store, CacheStats, Store, TtlCache};
use crate::circuit_breaker::CircuitBreaker;
use crate::config::Config;
use crate::error::Error;
use crate::fallback::FallbackPolicy;
use crate::fetcher::BatchFetcher;
use crate::metrics::Metrics;
use crate::provider::LookupProvider;
use crate::request_coalescing::RequestCoalescer;

pub struct AvailabilityService {
    cache: Arc<TtlCache>,
    coalescer: RequestCoalescer,
    fallback: FallbackPolicy,
    metrics: Arc<Metrics>,
}

impl AvailabilityService {
    /// Build a service using the store selected by `config.cache`
    pub fn new(config: &Config, provider: Arc<dyn LookupProvider>) -> Result<Self, Error> {
        Self::with_store(config, provider, open_store(&config.cache))
    }

    /// Build a service on an explicit store
    pub fn with_store(
        config: &Config,
        provider: Arc<dyn LookupProvider>,
        store: Arc<dyn Store>,
    ) -> Result<Self, Error> {
        config.validate()?;

        let metrics = Arc::new(Metrics::new().map_err(|e| Error::Metrics(e.to_string()))?);
        let cache = Arc::new(TtlCache::new(store, &config.cache));

        let retry = config.retry.to_retry_policy();
        tracing::debug!(
            provider = provider.name(),
            max_attempts = retry.max_attempts,
            worst_case_backoff_ms = retry.total_backoff().as_millis() as u64,
            "Building batch fetcher"
        );
        let mut fetcher = BatchFetcher::new(
            provider,
            cache.clone(),
            metrics.clone(),
            &config.batch,
            retry,
        );
        if let Some(breaker) = config.circuit_breaker.to_circuit_breaker_config() {
            fetcher = fetcher.with_circuit_breaker(CircuitBreaker::new(breaker));
        }
        if let Some(limiter) = config.rate_limit.build_limiter() {
            fetcher = fetcher.with_rate_limiter(limiter);
        }

        let coalescer = RequestCoalescer::new(
            cache.clone(),
            Arc::new(fetcher),
            metrics.clone(),
            &config.coalescing,
        );
        let fallback = FallbackPolicy::new(cache.clone(), &config.fallback);

        Ok(Self {
            cache,
            coalescer,
            fallback,
            metrics,
        })
    }

    /// Drop expired and obsolete entries left by earlier runs
    pub async fn init(&self) -> usize {
        let removed = self.cache.prune().await;
        tracing::info!(removed = removed, "Lookup cache initialized");
        removed
    }

    pub async fn lookup(&self, subject_id: u64, region: &str) -> Resolved {
        match LookupKey::new(subject_id, region) {
            Ok(key) => self.lookup_key(key).await,
            Err(e) => {
                tracing::warn!(subject_id = subject_id, error = %e, "Rejecting lookup");
                self.metrics.record_lookup(Provenance::Default);
                Resolved {
                    subject_id,
                    region: region.trim().to_ascii_lowercase(),
                    provenance: Provenance::Default,
                    options: LookupResult::empty(),
                }
            }
        }
    }

    pub async fn lookup_key(&self, key: LookupKey) -> Resolved {
        tracing::debug!(state = "idle", key = %key, "Lookup requested");

        let resolved = match self.coalescer.request(key.clone()).await {
            Ok((result, provenance)) => Resolved::new(&key, result, provenance),
            Err(error) => self.fallback.resolve(&key, &error).await,
        };

        self.metrics.record_lookup(resolved.provenance);
        tracing::debug!(
            state = "settled",
            key = %key,
            provenance = %resolved.provenance,
            options = resolved.options.len(),
            "Lookup settled"
        );
        resolved
    }

    /// Look up many ids in one region; results follow the input order
    ///
    /// All lookups are issued together so cache misses share batch windows.
    pub async fn lookup_many(&self, subject_ids: &[u64], region: &str) -> Vec<Resolved> {
        join_all(subject_ids.iter().map(|&id| self.lookup(id, region))).await
    }

    pub async fn prune(&self) -> usize {
        self.cache.prune().await
    }

    /// Flush pending batches and stop accepting new upstream work
    ///
    /// Lookups after shutdown still resolve, through the fallback policy.
    pub async fn shutdown(&self) {
        if self.coalescer.is_shut_down() {
            tracing::debug!("Lookup service already shut down");
            return;
        }
        tracing::info!(
            pending = self.coalescer.pending_count(),
            "Shutting down lookup service"
        );
        self.coalescer.shutdown().await;
    }

    pub fn is_shut_down(&self) -> bool {
        self.coalescer.is_shut_down()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn pending_count(&self) -> usize {
        self.coalescer.pending_count()
    }
}
