//! Batch fetcher
//!
//! Turns one drained batch window into upstream calls:
//! - keys are grouped by region and de-duplicated
//! - each region is split into chunks of at most `max_batch_size` ids
//! - chunks run with at most `max_concurrency` in flight; one chunk failing
//!   never affects its siblings
//! - every attempt is bounded by `request_timeout` and gated by the circuit
//!   breaker and the outbound rate limiter
//! - ids the provider leaves out (partial batch) are retried alone with
//!   exponential backoff until the retry budget is spent
//!
//! The fetcher is the only component that writes to the cache.

use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::availability::{LookupKey, LookupResult};
use crate::cache::TtlCache;
use crate::circuit_breaker::CircuitBreaker;
use crate::config::BatchConfig;
use crate::error::{FetchError, ProviderError};
use crate::metrics::Metrics;
use crate::provider::LookupProvider;
use crate::rate_limit::UpstreamRateLimiter;
use crate::retry::RetryPolicy;

/// Per-key outcome of one `fetch_batch` call
pub type BatchOutcome = HashMap<LookupKey, Result<LookupResult, FetchError>>;

pub struct BatchFetcher {
    provider: Arc<dyn LookupProvider>,
    cache: Arc<TtlCache>,
    metrics: Arc<Metrics>,
    retry: RetryPolicy,
    breaker: Option<CircuitBreaker>,
    limiter: Option<UpstreamRateLimiter>,
    max_batch_size: usize,
    max_concurrency: usize,
    request_timeout: Duration,
}

impl BatchFetcher {
    pub fn new(
        provider: Arc<dyn LookupProvider>,
        cache: Arc<TtlCache>,
        metrics: Arc<Metrics>,
        batch: &BatchConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            cache,
            metrics,
            retry,
            breaker: None,
            limiter: None,
            max_batch_size: batch.max_batch_size.max(1),
            max_concurrency: batch.max_concurrency.max(1),
            request_timeout: batch.request_timeout(),
        }
    }

    pub fn with_circuit_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: UpstreamRateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn circuit_breaker(&self) -> Option<&CircuitBreaker> {
        self.breaker.as_ref()
    }

    /// Fetch every key; each key in the input appears exactly once in the
    /// output, settled either with a result or with the error that ended its
    /// retries.
    pub async fn fetch_batch(&self, keys: Vec<LookupKey>) -> BatchOutcome {
        let chunks = self.plan_chunks(keys);
        if chunks.is_empty() {
            return HashMap::new();
        }

        tracing::debug!(
            chunks = chunks.len(),
            provider = self.provider.name(),
            "Dispatching batch"
        );

        stream::iter(chunks)
            .map(|chunk| self.fetch_chunk(chunk))
            .buffer_unordered(self.max_concurrency)
            .flat_map(stream::iter)
            .collect()
            .await
    }

    /// Group by region, de-duplicate, split into `max_batch_size` chunks
    fn plan_chunks(&self, keys: Vec<LookupKey>) -> Vec<Vec<LookupKey>> {
        let mut by_region: BTreeMap<String, BTreeSet<LookupKey>> = BTreeMap::new();
        for key in keys {
            by_region
                .entry(key.region().to_string())
                .or_default()
                .insert(key);
        }

        by_region
            .into_values()
            .flat_map(|keys| {
                let keys: Vec<LookupKey> = keys.into_iter().collect();
                keys.chunks(self.max_batch_size)
                    .map(<[LookupKey]>::to_vec)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Run one chunk to completion, retrying whatever is still unresolved
    async fn fetch_chunk(
        &self,
        chunk: Vec<LookupKey>,
    ) -> Vec<(LookupKey, Result<LookupResult, FetchError>)> {
        let region = match chunk.first() {
            Some(key) => key.region().to_string(),
            None => return Vec::new(),
        };

        let mut settled = Vec::with_capacity(chunk.len());
        let mut remaining = chunk;
        let mut attempt: u32 = 0;

        loop {
            let delay = self.retry.backoff_duration(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let ids: Vec<u64> = remaining.iter().map(LookupKey::subject_id).collect();
            tracing::debug!(
                state = "fetching",
                region = %region,
                ids = ids.len(),
                attempt = attempt + 1,
                "Upstream attempt"
            );

            let last_error = match self.attempt(&ids, &region).await {
                Ok(mut found) => {
                    let mut missing = Vec::new();
                    for key in remaining {
                        match found.remove(&key.subject_id()) {
                            Some(result) => {
                                self.cache.set(&key, result.clone()).await;
                                tracing::debug!(
                                    state = "resolved",
                                    key = %key,
                                    options = result.len(),
                                    "Key resolved"
                                );
                                settled.push((key, Ok(result)));
                            }
                            None => missing.push(key),
                        }
                    }
                    remaining = missing;
                    FetchError::Missing
                }
                Err(err) => err,
            };

            if remaining.is_empty() {
                break;
            }

            if !self.retry.should_retry(attempt) {
                let attempts = attempt + 1;
                tracing::warn!(
                    region = %region,
                    keys = remaining.len(),
                    attempts = attempts,
                    error = %last_error,
                    "Giving up on upstream lookup"
                );
                self.metrics.record_exhausted(remaining.len());
                settled.extend(remaining.into_iter().map(|key| {
                    (key, Err(FetchError::exhausted(attempts, last_error.clone())))
                }));
                break;
            }

            attempt += 1;
            self.metrics.record_retry();
            tracing::debug!(
                state = "retrying",
                region = %region,
                keys = remaining.len(),
                attempt = attempt + 1,
                error = %last_error,
                "Retrying unresolved keys"
            );
        }

        settled
    }

    /// One upstream call guarded by breaker, limiter and timeout
    async fn attempt(
        &self,
        ids: &[u64],
        region: &str,
    ) -> Result<HashMap<u64, LookupResult>, FetchError> {
        let permit = match &self.breaker {
            Some(breaker) => match breaker.try_acquire() {
                Some(permit) => Some(permit),
                None => {
                    self.metrics.record_upstream_failure("circuit_open");
                    return Err(FetchError::CircuitOpen);
                }
            },
            None => None,
        };

        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let started = Instant::now();
        let outcome =
            tokio::time::timeout(self.request_timeout, self.provider.lookup_batch(ids, region))
                .await;
        self.metrics.record_upstream_call(started.elapsed());

        let error = match outcome {
            Ok(Ok(found)) => {
                if let Some(permit) = permit {
                    permit.succeeded();
                }
                return Ok(found);
            }
            Ok(Err(err)) => FetchError::Provider(err),
            Err(_) => FetchError::Timeout(self.request_timeout.as_millis() as u64),
        };

        if let Some(permit) = permit {
            permit.failed();
        }
        self.metrics.record_upstream_failure(failure_reason(&error));
        tracing::warn!(region = %region, ids = ids.len(), error = %error, "Upstream attempt failed");
        Err(error)
    }
}

fn failure_reason(error: &FetchError) -> &'static str {
    match error {
        FetchError::Provider(ProviderError::Transport(_)) => "transport",
        FetchError::Provider(ProviderError::Status { .. }) => "status",
        FetchError::Provider(ProviderError::Malformed(_)) => "malformed",
        FetchError::Provider(ProviderError::Timeout) | FetchError::Timeout(_) => "timeout",
        FetchError::CircuitOpen => "circuit_open",
        _ => "other",
    }
}
