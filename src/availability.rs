//! Availability domain types
//!
//! - `LookupKey`: subject identifier + region, the unit of caching and fetching
//! - `AvailabilityOption` / `AccessType` / `Price`: one way to watch a title
//! - `LookupResult`: all options for one key (may be empty)
//! - `Provenance` / `Resolved`: what callers of the service receive

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Region codes are 2-3 ASCII letters, stored lowercase
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid region code: {0:?}")]
pub struct InvalidRegion(pub String);

/// Identifies one cacheable unit of work
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LookupKey {
    subject_id: u64,
    region: String,
}

impl LookupKey {
    /// Build a key, normalizing the region to lowercase.
    pub fn new(subject_id: u64, region: &str) -> Result<Self, InvalidRegion> {
        let trimmed = region.trim();
        let valid = (2..=3).contains(&trimmed.len())
            && trimmed.chars().all(|c| c.is_ascii_alphabetic());
        if !valid {
            return Err(InvalidRegion(region.to_string()));
        }

        Ok(Self {
            subject_id,
            region: trimmed.to_ascii_lowercase(),
        })
    }

    pub fn subject_id(&self) -> u64 {
        self.subject_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

impl std::fmt::Display for LookupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.subject_id, self.region)
    }
}

/// How a title is made available by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Subscription,
    Rental,
    Purchase,
    Free,
}

impl AccessType {
    /// Map an upstream access type label onto our enumeration.
    ///
    /// Returns `None` for labels we do not surface (e.g. "addon" channels are
    /// folded into subscription, unknown labels are dropped).
    pub fn from_upstream(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "subscription" | "sub" | "flatrate" | "addon" => Some(AccessType::Subscription),
            "rent" | "rental" => Some(AccessType::Rental),
            "buy" | "purchase" => Some(AccessType::Purchase),
            "free" | "ads" => Some(AccessType::Free),
            _ => None,
        }
    }
}

/// Price as reported upstream (amount kept as a decimal string)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// One way to watch a subject in a region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityOption {
    pub provider: String,
    pub access_type: AccessType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
}

impl AvailabilityOption {
    pub fn new(provider: impl Into<String>, access_type: AccessType) -> Self {
        Self {
            provider: provider.into(),
            access_type,
            link: None,
            price: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_price(mut self, amount: impl Into<String>, currency: Option<String>) -> Self {
        self.price = Some(Price {
            amount: amount.into(),
            currency,
        });
        self
    }
}

/// All availability options for one key. Empty means "no availability found",
/// which is a valid, cacheable answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupResult {
    pub options: Vec<AvailabilityOption>,
}

impl LookupResult {
    pub fn new(options: Vec<AvailabilityOption>) -> Self {
        Self { options }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }
}

impl From<Vec<AvailabilityOption>> for LookupResult {
    fn from(options: Vec<AvailabilityOption>) -> Self {
        Self { options }
    }
}

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Fresh cache hit
    Cache,
    /// Live upstream call
    Api,
    /// Expired cache entry surfaced after an upstream failure
    Stale,
    /// Static default catalog
    Default,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Cache => "cache",
            Provenance::Api => "api",
            Provenance::Stale => "stale",
            Provenance::Default => "default",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A settled lookup as handed to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    pub subject_id: u64,
    pub region: String,
    pub provenance: Provenance,
    pub options: LookupResult,
}

impl Resolved {
    pub fn new(key: &LookupKey, options: LookupResult, provenance: Provenance) -> Self {
        Self {
            subject_id: key.subject_id(),
            region: key.region().to_string(),
            provenance,
            options,
        }
    }
}
