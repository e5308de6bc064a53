// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cache::CacheConfig;
use crate::error::ConfigError;

pub mod batch;
pub mod circuit_breaker;
pub mod coalescing;
pub mod fallback;
pub mod logging;
pub mod provider;
pub mod rate_limit;
pub mod retry;

pub use batch::BatchConfig;
pub use circuit_breaker::CircuitBreakerSection;
pub use coalescing::CoalescingConfig;
pub use fallback::FallbackConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use provider::ProviderConfig;
pub use rate_limit::RateLimitConfig;
pub use retry::RetryConfig;

/// The single configuration surface of the lookup service
///
/// Every section is optional in YAML and falls back to the defaults in
/// `crate::constants`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub coalescing: CoalescingConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSection,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, ConfigError> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        // Every referenced variable must exist before substituting
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            if std::env::var(var_name).is_err() {
                return Err(ConfigError::MissingEnvVar(var_name.to_string()));
            }
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        Ok(serde_yaml::from_str(&substituted)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_with_env(&yaml)
    }

    /// Load and validate in one step
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate().map_err(ConfigError::Invalid)?;
        self.coalescing.validate().map_err(ConfigError::Invalid)?;
        self.batch.validate().map_err(ConfigError::Invalid)?;
        self.retry.validate().map_err(ConfigError::Invalid)?;
        self.circuit_breaker
            .validate()
            .map_err(ConfigError::Invalid)?;
        self.rate_limit.validate().map_err(ConfigError::Invalid)?;
        self.provider.validate().map_err(ConfigError::Invalid)?;
        self.logging.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }
}
