// Behavioural properties: idempotent caching, de-duplication, failure
// isolation, bounded retries, TTL differential, ordering

use std::sync::Arc;
use std::time::Duration;

use streamscout::cache::MemoryStore;
use streamscout::fallback::default_catalog;
use streamscout::{LookupResult, Provenance};

use super::harness::{max, netflix, service, service_with, test_config, CountingProvider};

#[tokio::test]
async fn test_repeated_lookups_are_idempotent() {
    let provider = CountingProvider::new();
    provider.answer(603, "us", netflix());
    let service = service(provider.clone());

    let first = service.lookup(603, "us").await;
    for _ in 0..5 {
        let again = service.lookup(603, "us").await;
        assert_eq!(again.options, first.options);
        assert_eq!(again.provenance, Provenance::Cache);
    }
    assert_eq!(provider.calls(), 1);
    assert_eq!(service.cache_stats().hits, 5);
}

#[tokio::test]
async fn test_empty_result_is_cached() {
    let provider = CountingProvider::new();
    let service = service(provider.clone());

    let first = service.lookup(42, "us").await;
    assert_eq!(first.provenance, Provenance::Api);
    assert!(first.options.is_empty());

    let second = service.lookup(42, "us").await;
    assert_eq!(second.provenance, Provenance::Cache);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_duplicate_ids_in_one_window_are_sent_once() {
    let provider = CountingProvider::new();
    let service = service(provider.clone());

    let results = service.lookup_many(&[603, 155, 603, 603], "us").await;

    assert_eq!(results.len(), 4);
    assert_eq!(provider.calls(), 1);
    let (mut ids, region) = provider.requests().remove(0);
    ids.sort_unstable();
    assert_eq!(ids, vec![155, 603]);
    assert_eq!(region, "us");
}

#[tokio::test]
async fn test_lookup_many_preserves_input_order() {
    let provider = CountingProvider::new();
    provider.answer(1, "gb", netflix());
    provider.answer(3, "gb", max());
    let service = service(provider);

    let results = service.lookup_many(&[3, 2, 1], "gb").await;

    let ids: Vec<u64> = results.iter().map(|r| r.subject_id).collect();
    assert_eq!(ids, vec![3, 2, 1]);
    assert_eq!(results[0].options, max());
    assert!(results[1].options.is_empty());
    assert_eq!(results[2].options, netflix());
}

#[tokio::test]
async fn test_missing_id_does_not_affect_its_batch_siblings() {
    let provider = CountingProvider::new();
    provider.answer(603, "us", netflix());
    provider.never_answer(9999);
    let service = service(provider.clone());

    let results = service.lookup_many(&[603, 9999, 155], "us").await;

    assert_eq!(results[0].provenance, Provenance::Api);
    assert_eq!(results[0].options, netflix());
    assert_eq!(results[1].provenance, Provenance::Default);
    assert_eq!(results[2].provenance, Provenance::Api);

    // Only the missing id is retried
    assert_eq!(provider.times_requested(603), 1);
    assert_eq!(provider.times_requested(9999), 3);
}

#[tokio::test]
async fn test_failing_region_does_not_affect_other_regions() {
    let provider = CountingProvider::new();
    provider.answer(603, "us", netflix());
    provider.fail_region("gb");
    let service = service(provider.clone());

    let (us, gb) = tokio::join!(service.lookup(603, "us"), service.lookup(603, "gb"));

    assert_eq!(us.provenance, Provenance::Api);
    assert_eq!(us.options, netflix());
    assert_eq!(gb.provenance, Provenance::Default);
    assert_eq!(gb.options, default_catalog("gb"));
}

#[tokio::test]
async fn test_retries_are_bounded_by_max_attempts() {
    let provider = CountingProvider::new();
    provider.set_down(true);
    let mut config = test_config();
    config.retry.max_attempts = 4;
    let service = service_with(config, provider.clone(), Arc::new(MemoryStore::default()));

    let resolved = service.lookup(9999, "us").await;

    assert_eq!(resolved.provenance, Provenance::Default);
    assert_eq!(provider.calls(), 4);
    assert_eq!(service.metrics().retries(), 3);
    assert_eq!(service.metrics().exhausted(), 1);
}

#[tokio::test]
async fn test_empty_results_expire_before_results_with_data() {
    let provider = CountingProvider::new();
    provider.answer(2, "us", netflix());
    let mut config = test_config();
    config.cache.ttl_empty_secs = 1;
    config.cache.ttl_with_data_secs = 3600;
    let service = service_with(config, provider.clone(), Arc::new(MemoryStore::default()));

    service.lookup_many(&[1, 2], "us").await;
    assert_eq!(provider.calls(), 1);

    tokio::time::sleep(Duration::from_millis(1_100)).await;

    let empty = service.lookup(1, "us").await;
    let with_data = service.lookup(2, "us").await;

    assert_eq!(empty.provenance, Provenance::Api, "empty entry expired");
    assert_eq!(with_data.provenance, Provenance::Cache);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_invalid_region_resolves_to_empty_default() {
    let provider = CountingProvider::new();
    let service = service(provider.clone());

    for region in ["", "u", "united-states", "u1"] {
        let resolved = service.lookup(603, region).await;
        assert_eq!(resolved.provenance, Provenance::Default);
        assert_eq!(resolved.options, LookupResult::empty());
    }
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_slow_upstream_times_out_into_fallback() {
    let provider = CountingProvider::new();
    provider.answer(603, "us", netflix());
    provider.set_delay(Duration::from_millis(300));
    let mut config = test_config();
    config.batch.request_timeout_ms = 20;
    config.retry.max_attempts = 2;
    let service = service_with(config, provider.clone(), Arc::new(MemoryStore::default()));

    let resolved = service.lookup(603, "us").await;

    assert_eq!(resolved.provenance, Provenance::Default);
    assert_eq!(provider.calls(), 2);
    assert_eq!(service.metrics().upstream_failures("timeout"), 2);
}
