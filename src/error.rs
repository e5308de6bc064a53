// Error types module

use thiserror::Error;

use crate::cache::CacheError;

/// Errors raised by a `LookupProvider` for one upstream call
///
/// `Clone` because a failed chunk settles every key it carried and each
/// waiter receives its own copy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Connection refused, DNS failure, reset, ...
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx response from the availability API
    #[error("upstream returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("upstream call timed out")]
    Timeout,
}

impl ProviderError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        ProviderError::Status {
            status,
            message: message.into(),
        }
    }
}

/// Why a key could not be resolved by the batch fetcher
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The attempt exceeded `request_timeout_ms`
    #[error("upstream request timed out after {0}ms")]
    Timeout(u64),

    /// Upstream answered the chunk but left this id out
    #[error("upstream response did not include this id")]
    Missing,

    /// Circuit breaker rejected the attempt
    #[error("upstream circuit is open")]
    CircuitOpen,

    /// The coalescer was shut down before the key was fetched
    #[error("lookup service is shutting down")]
    ShuttingDown,

    /// Every attempt failed; `last` is the final attempt's error
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<FetchError>,
    },
}

impl FetchError {
    pub fn exhausted(attempts: u32, last: FetchError) -> Self {
        FetchError::Exhausted {
            attempts,
            last: Box::new(last),
        }
    }
}

/// Configuration loading and validation failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("environment variable '{0}' is referenced but not set")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Crate-level error for callers that drive the service end to end
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("metrics setup failed: {0}")]
    Metrics(String),

    #[error("logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
