// Service lifecycle: persistence across restarts, pruning at init,
// shutdown, circuit breaking, metrics

use std::sync::Arc;
use tempfile::TempDir;

use streamscout::cache::{CacheConfig, DiskStore, Store, StoreKind, TtlCache};
use streamscout::{AvailabilityService, LookupKey, Provenance};

use super::harness::{max, netflix, service, service_with, test_config, CountingProvider};

fn disk_config(dir: &TempDir) -> streamscout::Config {
    let mut config = test_config();
    config.cache.store = StoreKind::Disk;
    config.cache.dir = dir.path().to_string_lossy().to_string();
    config
}

#[tokio::test]
async fn test_disk_cache_survives_restart() {
    let dir = TempDir::new().unwrap();

    let first_provider = CountingProvider::new();
    first_provider.answer(603, "us", netflix());
    let first = AvailabilityService::new(&disk_config(&dir), first_provider.clone()).unwrap();
    assert_eq!(first.lookup(603, "us").await.provenance, Provenance::Api);
    first.shutdown().await;

    let second_provider = CountingProvider::new();
    let second = AvailabilityService::new(&disk_config(&dir), second_provider.clone()).unwrap();
    second.init().await;

    let resolved = second.lookup(603, "us").await;
    assert_eq!(resolved.provenance, Provenance::Cache);
    assert_eq!(resolved.options, netflix());
    assert_eq!(second_provider.calls(), 0);
}

#[tokio::test]
async fn test_init_prunes_entries_from_older_cache_versions() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn Store> = Arc::new(DiskStore::new(dir.path()));

    let old = TtlCache::new(
        store.clone(),
        &CacheConfig {
            version: "v2".to_string(),
            ..Default::default()
        },
    );
    old.set(&LookupKey::new(603, "us").unwrap(), max()).await;
    old.set(&LookupKey::new(155, "pl").unwrap(), max()).await;

    let provider = CountingProvider::new();
    let service = service_with(disk_config(&dir), provider, store.clone());

    assert_eq!(service.init().await, 2);
    assert!(store.keys("streaming").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_lookups_after_shutdown_use_fallback() {
    let provider = CountingProvider::new();
    provider.answer(603, "us", netflix());
    let service = service(provider.clone());

    assert!(!service.is_shut_down());
    service.shutdown().await;
    service.shutdown().await;
    assert!(service.is_shut_down());
    let resolved = service.lookup(603, "us").await;

    assert_eq!(resolved.provenance, Provenance::Default);
    assert_eq!(provider.calls(), 0);
    assert_eq!(service.pending_count(), 0);
}

#[tokio::test]
async fn test_shutdown_flushes_pending_lookups() {
    let provider = CountingProvider::new();
    provider.answer(603, "us", netflix());
    let mut config = test_config();
    config.coalescing.window_ms = 60_000;
    let service = Arc::new(service_with(
        config,
        provider.clone(),
        Arc::new(streamscout::cache::MemoryStore::default()),
    ));

    let waiting = {
        let service = service.clone();
        tokio::spawn(async move { service.lookup(603, "us").await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(service.pending_count(), 1);

    service.shutdown().await;

    let resolved = waiting.await.unwrap();
    assert_eq!(resolved.provenance, Provenance::Api);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_open_circuit_stops_calling_upstream() {
    let provider = CountingProvider::new();
    provider.set_down(true);
    let mut config = test_config();
    config.circuit_breaker.enabled = true;
    config.circuit_breaker.failure_threshold = 1;
    config.circuit_breaker.timeout_seconds = 60;
    let service = service_with(
        config,
        provider.clone(),
        Arc::new(streamscout::cache::MemoryStore::default()),
    );

    assert_eq!(service.lookup(1, "us").await.provenance, Provenance::Default);
    assert_eq!(provider.calls(), 1, "retries rejected by the open circuit");

    assert_eq!(service.lookup(2, "us").await.provenance, Provenance::Default);
    assert_eq!(provider.calls(), 1);
    assert!(service.metrics().upstream_failures("circuit_open") >= 4);
}

#[tokio::test]
async fn test_metrics_export_reflects_lookups() {
    let provider = CountingProvider::new();
    provider.answer(603, "us", netflix());
    let service = service(provider);

    service.lookup(603, "us").await;
    service.lookup(603, "us").await;

    let text = service.metrics().export_prometheus();
    assert!(text.contains("streamscout_lookups_total{provenance=\"api\"} 1"));
    assert!(text.contains("streamscout_lookups_total{provenance=\"cache\"} 1"));
    assert!(text.contains("streamscout_upstream_calls_total 1"));

    let stats = service.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.writes, 1);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut config = test_config();
    config.batch.max_batch_size = 0;

    let err = AvailabilityService::new(&config, CountingProvider::new())
        .err()
        .expect("zero batch size must be rejected");
    assert!(err.to_string().contains("batch.max_batch_size"));
}

struct PanickingProvider;

#[async_trait::async_trait]
impl streamscout::provider::LookupProvider for PanickingProvider {
    async fn lookup_batch(
        &self,
        _subject_ids: &[u64],
        _region: &str,
    ) -> Result<std::collections::HashMap<u64, streamscout::LookupResult>, streamscout::ProviderError>
    {
        panic!("provider bug");
    }

    fn name(&self) -> &'static str {
        "panicking"
    }
}

#[tokio::test]
async fn test_panicking_provider_falls_back_instead_of_hanging() {
    let service = AvailabilityService::with_store(
        &test_config(),
        Arc::new(PanickingProvider),
        Arc::new(streamscout::cache::MemoryStore::default()),
    )
    .unwrap();

    for _ in 0..2 {
        let resolved = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            service.lookup(603, "us"),
        )
        .await
        .expect("lookup must settle");
        assert_eq!(resolved.provenance, Provenance::Default);
        assert!(!resolved.options.is_empty());
    }
    assert_eq!(service.pending_count(), 0);
}
