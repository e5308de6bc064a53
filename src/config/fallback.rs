//! Fallback configuration.

use serde::{Deserialize, Serialize};

fn default_use_default_catalog() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Answer failed lookups with the built-in per-region catalog; when false
    /// they resolve to an empty `default` result
    #[serde(default = "default_use_default_catalog")]
    pub use_default_catalog: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            use_default_catalog: default_use_default_catalog(),
        }
    }
}
