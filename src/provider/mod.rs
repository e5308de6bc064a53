//! Upstream lookup providers
//!
//! A provider answers one chunk of subject ids for one region. Ids it leaves
//! out of the returned map are "missing" and get retried by the batch
//! fetcher; an id mapped to an empty result is a real "nothing streams this"
//! answer and is cached like any other.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::availability::LookupResult;
use crate::error::ProviderError;

pub mod http;
pub mod static_provider;

pub use http::HttpLookupProvider;
pub use static_provider::StaticLookupProvider;

#[async_trait]
pub trait LookupProvider: Send + Sync {
    /// Resolve a chunk of ids for `region` in one upstream call
    async fn lookup_batch(
        &self,
        subject_ids: &[u64],
        region: &str,
    ) -> Result<HashMap<u64, LookupResult>, ProviderError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}
