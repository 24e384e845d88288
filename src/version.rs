// src/version.rs

//! Version classification and ordering.
//!
//! A version string maps to exactly one distribution type by a frozen
//! structural rule, because installed-directory names embed the type and a
//! reclassification would orphan every previously installed release.

use std::cmp::Ordering;
use std::fmt;

use crate::catalog::{self, CatalogClient, Channel};
use crate::error::{Error, Result};

/// Marker for the frozen legacy series.
const LEGACY_SERIES: &str = "1";

/// Structural bucket a version belongs to, encoded into directory names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistType {
    /// Legacy 1.x series
    JBallerina,
    /// Everything after the 1.x series
    Ballerina,
}

impl DistType {
    /// Classify a version by its leading dot-component. Pure and stable:
    /// `1.2.3` is legacy, `2201.8.0` and `slp1` are current, forever.
    pub fn classify(version: &str) -> DistType {
        if version.split('.').next() == Some(LEGACY_SERIES) {
            DistType::JBallerina
        } else {
            DistType::Ballerina
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DistType::JBallerina => "jballerina",
            DistType::Ballerina => "ballerina",
        }
    }
}

impl fmt::Display for DistType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory name of an installed distribution: `{type}-{version}`.
pub fn dist_dir_name(version: &str) -> String {
    format!("{}-{}", DistType::classify(version), version)
}

/// Version part of a `{type}-{version}` directory or pointer token.
pub fn version_of_token(token: &str) -> Option<&str> {
    let (_, version) = token.split_once('-')?;
    if version.is_empty() {
        None
    } else {
        Some(version)
    }
}

/// Order two versions by their dot-separated components: numeric comparison
/// where both components parse as integers, string ordering otherwise, with
/// a shorter version sorting before its extension (`1.2` < `1.2.3`).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left: Vec<&str> = a.split('.').collect();
    let right: Vec<&str> = b.split('.').collect();
    for (x, y) in left.iter().zip(right.iter()) {
        let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
            (Ok(nx), Ok(ny)) => nx.cmp(&ny),
            _ => x.cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    left.len().cmp(&right.len())
}

/// Most recent version within the same patch series as `current`, as
/// categorized by the server. `None` means the server had nothing newer
/// under that anchor; the caller compares for equality to decide whether
/// anything needs installing.
pub fn resolve_latest_patch(client: &CatalogClient, current: &str) -> Result<Option<String>> {
    client.fetch_latest(current, "patch")
}

/// Highest version in the newest channel, resolved through the patch-latest
/// anchor.
pub fn resolve_latest_in_catalog(client: &CatalogClient) -> Result<String> {
    let channels = client.fetch_channels()?;
    let newest = channels
        .first()
        .ok_or_else(|| Error::Server("the catalog returned no channels".to_string()))?;
    let anchor = newest
        .distributions
        .iter()
        .map(|d| d.version.as_str())
        .max_by(|a, b| compare_versions(a, b))
        .ok_or_else(|| Error::Server("the catalog returned an empty channel".to_string()))?;
    Ok(client
        .fetch_latest(anchor, "patch")?
        .unwrap_or_else(|| anchor.to_string()))
}

/// True iff some channel's distribution list contains `version`.
pub fn is_valid_version(channels: &[Channel], version: &str) -> bool {
    catalog::find_distribution(channels, version).is_some()
}

/// Human-oriented label used by `list` output.
pub fn display_name(version: &str) -> String {
    if DistType::classify(version) == DistType::JBallerina {
        return format!("jballerina version {}", version);
    }
    if let Some(n) = version.strip_prefix("slp") {
        return format!("Preview {}", n);
    }
    if let Some(rest) = version.strip_prefix("sl") {
        // slalpha5 -> "Alpha 5", slbeta2 -> "Beta 2"
        let digits = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (tag, number) = rest.split_at(digits);
        let mut chars = tag.chars();
        if let Some(first) = chars.next() {
            let capitalized: String = first.to_uppercase().chain(chars).collect();
            return format!("{} {}", capitalized, number).trim_end().to_string();
        }
    }
    version.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_is_structural() {
        assert_eq!(DistType::classify("1.2.3"), DistType::JBallerina);
        assert_eq!(DistType::classify("1.0.4"), DistType::JBallerina);
        assert_eq!(DistType::classify("2201.8.0"), DistType::Ballerina);
        assert_eq!(DistType::classify("slp1"), DistType::Ballerina);
        assert_eq!(DistType::classify("slbeta2"), DistType::Ballerina);
    }

    #[test]
    fn test_dist_dir_name() {
        assert_eq!(dist_dir_name("1.2.3"), "jballerina-1.2.3");
        assert_eq!(dist_dir_name("slp1"), "ballerina-slp1");
        assert_eq!(dist_dir_name("2201.8.0"), "ballerina-2201.8.0");
    }

    #[test]
    fn test_version_of_token() {
        assert_eq!(version_of_token("jballerina-1.2.3"), Some("1.2.3"));
        assert_eq!(version_of_token("ballerina-slp1"), Some("slp1"));
        assert_eq!(version_of_token("ballerina-"), None);
        assert_eq!(version_of_token("bogus"), None);
    }

    #[test]
    fn test_compare_numeric_components() {
        assert_eq!(compare_versions("1.2.3", "1.2.13"), Ordering::Less);
        assert_eq!(compare_versions("1.2.13", "1.2.3"), Ordering::Greater);
        assert_eq!(compare_versions("2201.8.0", "2201.8.0"), Ordering::Equal);
        // Plain string comparison would get 1.2.13 < 1.2.3 wrong
        assert!("1.2.13" < "1.2.3");
    }

    #[test]
    fn test_compare_mixed_components() {
        assert_eq!(compare_versions("slp1", "slp2"), Ordering::Less);
        assert_eq!(compare_versions("1.2", "1.2.3"), Ordering::Less);
        assert_eq!(compare_versions("2201.1.0", "2201.0.3"), Ordering::Greater);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("1.2.3"), "jballerina version 1.2.3");
        assert_eq!(display_name("slp1"), "Preview 1");
        assert_eq!(display_name("slbeta2"), "Beta 2");
        assert_eq!(display_name("slalpha5"), "Alpha 5");
        assert_eq!(display_name("2201.8.0"), "2201.8.0");
    }
}
