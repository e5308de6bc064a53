//! Upstream provider configuration.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PROVIDER_URL;

fn default_endpoint() -> String {
    DEFAULT_PROVIDER_URL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Availability proxy endpoint receiving `{"ids": [...], "country": ".."}`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Sent as `Authorization: Bearer <api_key>`; usually `${STREAMING_API_KEY}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(format!(
                "provider.endpoint '{}' must be an http:// or https:// URL",
                self.endpoint
            ));
        }
        if matches!(&self.api_key, Some(key) if key.trim().is_empty()) {
            return Err("provider.api_key cannot be empty when set".to_string());
        }
        Ok(())
    }
}
