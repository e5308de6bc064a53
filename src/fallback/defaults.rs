//! Built-in default catalog
//!
//! Popular subscription services per region, shown when a lookup failed and
//! nothing (not even an expired entry) is cached for it.

use crate::availability::{AccessType, AvailabilityOption, LookupResult};

const US: &[&str] = &["Netflix", "Prime Video", "Hulu", "Max", "Disney+"];
const GB: &[&str] = &["Netflix", "Prime Video", "Disney+", "NOW", "BBC iPlayer"];
const PL: &[&str] = &["Netflix", "Max", "Prime Video", "Disney+", "Canal+ Online", "Player"];
const DE: &[&str] = &["Netflix", "Prime Video", "Disney+", "WOW", "RTL+"];
const FR: &[&str] = &["Netflix", "Prime Video", "Disney+", "Canal+"];
const CA: &[&str] = &["Netflix", "Prime Video", "Crave", "Disney+"];
const GENERIC: &[&str] = &["Netflix", "Prime Video", "Disney+"];

/// Provider names for `region`, or the generic list for unknown regions
pub fn providers_for(region: &str) -> &'static [&'static str] {
    match region {
        "us" => US,
        "gb" | "uk" => GB,
        "pl" => PL,
        "de" => DE,
        "fr" => FR,
        "ca" => CA,
        _ => GENERIC,
    }
}

/// Whether `region` has its own entry rather than the generic list
pub fn has_region(region: &str) -> bool {
    matches!(region, "us" | "gb" | "uk" | "pl" | "de" | "fr" | "ca")
}

pub fn default_catalog(region: &str) -> LookupResult {
    providers_for(region)
        .iter()
        .map(|name| AvailabilityOption::new(*name, AccessType::Subscription))
        .collect::<Vec<_>>()
        .into()
}
