//! In-process provider backed by a fixed table
//!
//! Used by the CLI's offline mode and by tests that need a deterministic
//! upstream. Ids with no entry for the region answer with an empty result;
//! ids marked missing are left out of every response.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::LookupProvider;
use crate::availability::{AccessType, AvailabilityOption, LookupResult};
use crate::error::ProviderError;

#[derive(Debug, Default)]
pub struct StaticLookupProvider {
    entries: RwLock<HashMap<(u64, String), LookupResult>>,
    missing: RwLock<HashSet<u64>>,
    calls: AtomicUsize,
}

impl StaticLookupProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handful of well-known titles for offline runs
    pub fn demo() -> Self {
        let netflix = AvailabilityOption::new("Netflix", AccessType::Subscription);
        let max = AvailabilityOption::new("Max", AccessType::Subscription);
        let apple = AvailabilityOption::new("Apple TV", AccessType::Rental)
            .with_price("3.99", Some("USD".to_string()));

        Self::new()
            .with_entry(603, "us", LookupResult::new(vec![max.clone(), apple]))
            .with_entry(603, "gb", LookupResult::new(vec![netflix.clone()]))
            .with_entry(155, "us", LookupResult::new(vec![max]))
            .with_entry(155, "pl", LookupResult::new(vec![netflix]))
    }

    pub fn with_entry(self, subject_id: u64, region: &str, result: LookupResult) -> Self {
        self.insert(subject_id, region, result);
        self
    }

    /// Leave `subject_id` out of every response
    pub fn with_missing(self, subject_id: u64) -> Self {
        self.missing.write().insert(subject_id);
        self
    }

    pub fn insert(&self, subject_id: u64, region: &str, result: LookupResult) {
        self.entries
            .write()
            .insert((subject_id, region.to_ascii_lowercase()), result);
    }

    /// Number of `lookup_batch` calls served
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LookupProvider for StaticLookupProvider {
    async fn lookup_batch(
        &self,
        subject_ids: &[u64],
        region: &str,
    ) -> Result<HashMap<u64, LookupResult>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let entries = self.entries.read();
        let missing = self.missing.read();

        Ok(subject_ids
            .iter()
            .filter(|id| !missing.contains(id))
            .map(|&id| {
                let result = entries
                    .get(&(id, region.to_string()))
                    .cloned()
                    .unwrap_or_default();
                (id, result)
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
