// Streamscout: coalescing, batching TTL cache for streaming-availability lookups

pub mod availability;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod constants;
pub mod error;
pub mod fallback;
pub mod fetcher;
pub mod logging;
pub mod metrics;
pub mod provider;
pub mod rate_limit;
pub mod request_coalescing;
pub mod retry;
pub mod service;

pub use availability::{
    AccessType, AvailabilityOption, LookupKey, LookupResult, Price, Provenance, Resolved,
};
pub use config::Config;
pub use error::{Error, FetchError, ProviderError};
pub use service::AvailabilityService;
