// Shared helpers: a counting provider with scripted behaviour and
// service builders with test-friendly timings

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use streamscout::cache::{MemoryStore, Store, StoreKind};
use streamscout::config::Config;
use streamscout::provider::LookupProvider;
use streamscout::{
    AccessType, AvailabilityOption, AvailabilityService, LookupResult, ProviderError,
};

/// Provider that answers from a table, can be told to fail, and records
/// every call it receives
#[derive(Default)]
pub struct CountingProvider {
    table: Mutex<HashMap<(u64, String), LookupResult>>,
    /// Ids never answered (left out of responses)
    missing: Mutex<HashSet<u64>>,
    /// Regions whose calls fail outright
    failing_regions: Mutex<HashSet<String>>,
    /// Fail every call
    down: Mutex<bool>,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<(Vec<u64>, String)>>,
}

impl CountingProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answer(&self, id: u64, region: &str, result: LookupResult) {
        self.table.lock().insert((id, region.to_string()), result);
    }

    pub fn never_answer(&self, id: u64) {
        self.missing.lock().insert(id);
    }

    pub fn fail_region(&self, region: &str) {
        self.failing_regions.lock().insert(region.to_string());
    }

    pub fn set_down(&self, down: bool) {
        *self.down.lock() = down;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(Vec<u64>, String)> {
        self.requests.lock().clone()
    }

    /// Times `id` was sent upstream
    pub fn times_requested(&self, id: u64) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|(ids, _)| ids.contains(&id))
            .count()
    }
}

#[async_trait]
impl LookupProvider for CountingProvider {
    async fn lookup_batch(
        &self,
        subject_ids: &[u64],
        region: &str,
    ) -> Result<HashMap<u64, LookupResult>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .push((subject_ids.to_vec(), region.to_string()));

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if *self.down.lock() || self.failing_regions.lock().contains(region) {
            return Err(ProviderError::status(503, "Service Unavailable"));
        }

        let table = self.table.lock();
        let missing = self.missing.lock();
        Ok(subject_ids
            .iter()
            .filter(|id| !missing.contains(id))
            .map(|&id| {
                let result = table
                    .get(&(id, region.to_string()))
                    .cloned()
                    .unwrap_or_default();
                (id, result)
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

pub fn netflix() -> LookupResult {
    LookupResult::new(vec![AvailabilityOption::new(
        "Netflix",
        AccessType::Subscription,
    )
    .with_link("https://www.netflix.com/title/603")])
}

pub fn max() -> LookupResult {
    LookupResult::new(vec![AvailabilityOption::new("Max", AccessType::Subscription)])
}

/// Memory-backed config with short windows and near-zero backoff
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.cache.store = StoreKind::Memory;
    config.coalescing.window_ms = 10;
    config.retry.max_attempts = 3;
    config.retry.initial_backoff_ms = 1;
    config.retry.max_backoff_ms = 5;
    config.batch.request_timeout_ms = 1_000;
    config.circuit_breaker.enabled = false;
    config
}

pub fn service(provider: Arc<CountingProvider>) -> AvailabilityService {
    service_with(test_config(), provider, Arc::new(MemoryStore::default()))
}

pub fn service_with(
    config: Config,
    provider: Arc<CountingProvider>,
    store: Arc<dyn Store>,
) -> AvailabilityService {
    AvailabilityService::with_store(&config, provider, store).expect("valid test config")
}
