//! Fallback policy
//!
//! A failed lookup never surfaces as an error. The policy looks at the cache
//! once more, accepting an expired entry (`stale`), and otherwise answers
//! with the default catalog for the region (`default`).

use std::sync::Arc;

use crate::availability::{LookupKey, LookupResult, Provenance, Resolved};
use crate::cache::TtlCache;
use crate::config::FallbackConfig;
use crate::error::FetchError;

pub mod defaults;

pub use defaults::default_catalog;

pub struct FallbackPolicy {
    cache: Arc<TtlCache>,
    use_default_catalog: bool,
}

impl FallbackPolicy {
    pub fn new(cache: Arc<TtlCache>, config: &FallbackConfig) -> Self {
        Self {
            cache,
            use_default_catalog: config.use_default_catalog,
        }
    }

    /// Resolve `key` after `error` ended its fetch
    pub async fn resolve(&self, key: &LookupKey, error: &FetchError) -> Resolved {
        if let Some(entry) = self.cache.get_stale(key).await {
            tracing::info!(
                state = "fallback",
                key = %key,
                error = %error,
                created_at_ms = entry.created_at_ms,
                "Serving stale cache entry"
            );
            return Resolved::new(key, entry.result, Provenance::Stale);
        }

        tracing::info!(
            state = "fallback",
            key = %key,
            error = %error,
            generic = !defaults::has_region(key.region()),
            "Serving default catalog"
        );
        Resolved::new(key, self.default_for(key.region()), Provenance::Default)
    }

    /// Default answer for a region
    pub fn default_for(&self, region: &str) -> LookupResult {
        if self.use_default_catalog {
            default_catalog(region)
        } else {
            LookupResult::empty()
        }
    }
}
