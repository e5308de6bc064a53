//! Cache entry types
//!
//! This module defines the persisted cache structures:
//! - `TtlClass`: which expiry bucket an entry falls into
//! - `TtlSettings`: the durations behind each class, plus stale retention
//! - `CacheEntry`: a `LookupResult` with its creation time and class
//! - storage key helpers for the `"{prefix}_{subjectId}_{region}_{version}"` layout

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::availability::{LookupKey, LookupResult};

/// Expiry class of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlClass {
    /// Non-empty result, long TTL
    HasData,
    /// Empty result, short TTL
    Empty,
}

impl TtlClass {
    pub fn for_result(result: &LookupResult) -> Self {
        if result.is_empty() {
            TtlClass::Empty
        } else {
            TtlClass::HasData
        }
    }
}

/// TTL durations per class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlSettings {
    pub with_data: Duration,
    pub empty: Duration,
    /// How long past expiry an entry is kept for stale fallback
    pub stale_retention: Duration,
}

impl TtlSettings {
    pub fn ttl_for(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::HasData => self.with_data,
            TtlClass::Empty => self.empty,
        }
    }
}

/// Persisted cache entry (stored as JSON)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub result: LookupResult,
    /// Creation time, milliseconds since Unix epoch
    pub created_at_ms: u64,
    pub ttl_class: TtlClass,
}

impl CacheEntry {
    /// Create an entry stamped with the given time
    pub fn new_at(result: LookupResult, created_at_ms: u64) -> Self {
        let ttl_class = TtlClass::for_result(&result);
        Self {
            result,
            created_at_ms,
            ttl_class,
        }
    }

    pub fn has_data(&self) -> bool {
        self.ttl_class == TtlClass::HasData
    }

    pub fn expires_at_ms(&self, ttls: &TtlSettings) -> u64 {
        let ttl = ttls.ttl_for(self.ttl_class).as_millis() as u64;
        self.created_at_ms.saturating_add(ttl)
    }

    /// Expired entries are misses for regular reads
    pub fn is_expired(&self, now_ms: u64, ttls: &TtlSettings) -> bool {
        now_ms >= self.expires_at_ms(ttls)
    }

    /// Past the stale retention horizon: no longer useful even as a fallback
    pub fn is_discardable(&self, now_ms: u64, ttls: &TtlSettings) -> bool {
        let retention = ttls.stale_retention.as_millis() as u64;
        now_ms >= self.expires_at_ms(ttls).saturating_add(retention)
    }
}

/// Build the storage key for a lookup key
pub fn storage_key(prefix: &str, key: &LookupKey, version: &str) -> String {
    format!(
        "{}_{}_{}_{}",
        prefix,
        key.subject_id(),
        key.region(),
        version
    )
}

/// Split a storage key back into (subject id, region, version).
///
/// Returns `None` when the key does not belong to `prefix` or is malformed.
pub fn parse_storage_key<'a>(prefix: &str, storage_key: &'a str) -> Option<(u64, &'a str, &'a str)> {
    let rest = storage_key.strip_prefix(prefix)?.strip_prefix('_')?;
    let mut parts = rest.splitn(3, '_');
    let subject_id = parts.next()?.parse().ok()?;
    let region = parts.next()?;
    let version = parts.next()?;
    if region.is_empty() || version.is_empty() {
        return None;
    }
    Some((subject_id, region, version))
}

/// Current time in milliseconds since Unix epoch
#[inline]
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
