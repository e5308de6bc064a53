// The three reference scenarios: a popular title in the US, a title the
// provider never answers, and a burst of identical lookups in Poland

use std::sync::Arc;

use streamscout::cache::{CacheConfig, CacheEntry, MemoryStore, Store, TtlCache};
use streamscout::fallback::default_catalog;
use streamscout::{LookupKey, Provenance};

use super::harness::{max, netflix, service, service_with, test_config, CountingProvider};

#[tokio::test]
async fn test_603_us_comes_from_api_then_cache() {
    let provider = CountingProvider::new();
    provider.answer(603, "us", netflix());
    let service = service(provider.clone());

    let first = service.lookup(603, "us").await;
    assert_eq!(first.provenance, Provenance::Api);
    assert_eq!(first.options, netflix());

    let second = service.lookup(603, "US").await;
    assert_eq!(second.provenance, Provenance::Cache);
    assert_eq!(second.options, netflix());
    assert_eq!(second.region, "us");

    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_9999_without_history_falls_back_to_default_catalog() {
    let provider = CountingProvider::new();
    provider.never_answer(9999);
    let service = service(provider.clone());

    let resolved = service.lookup(9999, "us").await;

    assert_eq!(resolved.provenance, Provenance::Default);
    assert_eq!(resolved.options, default_catalog("us"));
    assert_eq!(provider.times_requested(9999), 3, "bounded by max_attempts");
}

#[tokio::test]
async fn test_9999_with_expired_entry_falls_back_to_stale() {
    let provider = CountingProvider::new();
    provider.set_down(true);

    let config = test_config();
    let store: Arc<dyn Store> = Arc::new(MemoryStore::default());

    // An entry written two days ago: past its 24h TTL but inside retention
    let key = LookupKey::new(9999, "us").unwrap();
    let writer = TtlCache::new(store.clone(), &config.cache);
    let two_days_ago = streamscout::cache::entry::now_millis() - 2 * 24 * 60 * 60 * 1000;
    let entry = CacheEntry::new_at(max(), two_days_ago);
    store
        .write(
            &writer.storage_key(&key),
            serde_json::to_string(&entry).unwrap(),
        )
        .await
        .unwrap();

    let service = service_with(config, provider.clone(), store);
    let resolved = service.lookup(9999, "us").await;

    assert_eq!(resolved.provenance, Provenance::Stale);
    assert_eq!(resolved.options, max());
    assert!(provider.calls() >= 1, "expired entry is not a cache hit");
}

#[tokio::test]
async fn test_five_concurrent_155_pl_lookups_make_one_call() {
    let provider = CountingProvider::new();
    provider.answer(155, "pl", netflix());
    let service = service(provider.clone());

    let lookups = (0..5).map(|_| service.lookup(155, "pl"));
    let results = futures::future::join_all(lookups).await;

    assert_eq!(provider.calls(), 1);
    for resolved in &results {
        assert_eq!(resolved.provenance, Provenance::Api);
        assert_eq!(resolved.options, netflix());
    }
    assert_eq!(service.metrics().coalesced(), 4);
}

#[tokio::test]
async fn test_default_catalog_can_be_disabled() {
    let provider = CountingProvider::new();
    provider.set_down(true);
    let mut config = test_config();
    config.fallback.use_default_catalog = false;
    let service = service_with(config, provider, Arc::new(MemoryStore::default()));

    let resolved = service.lookup(9999, "us").await;

    assert_eq!(resolved.provenance, Provenance::Default);
    assert!(resolved.options.is_empty());
}

#[tokio::test]
async fn test_entries_under_another_prefix_are_invisible() {
    // Entries written under another prefix are invisible
    let provider = CountingProvider::new();
    provider.set_down(true);
    let store: Arc<dyn Store> = Arc::new(MemoryStore::default());

    let other = TtlCache::new(
        store.clone(),
        &CacheConfig {
            prefix: "other".to_string(),
            ..Default::default()
        },
    );
    other
        .set(&LookupKey::new(9999, "us").unwrap(), max())
        .await;

    let service = service_with(test_config(), provider, store);
    let resolved = service.lookup(9999, "us").await;
    assert_eq!(resolved.provenance, Provenance::Default);
}
