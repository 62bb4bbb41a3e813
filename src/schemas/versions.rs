// Version descriptors shared by detection, resolution and verification.

use crate::libs::version::normalize;
use semver::Version;
use serde::Serialize;
use std::fmt;

/// Where a version string came from.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// The structured query API of the package source.
    Primary,
    /// The scraped human-facing item page.
    Fallback,
    /// Observed on this machine (package store, list command, version command).
    Local,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Primary => write!(f, "primary"),
            Provenance::Fallback => write!(f, "fallback"),
            Provenance::Local => write!(f, "local"),
        }
    }
}

/// A version as reported by a source, plus its normalized form.
///
/// The raw string is kept for display; comparisons only ever use `normalized`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VersionInfo {
    pub raw: String,
    #[serde(serialize_with = "serialize_normalized")]
    pub normalized: Option<Version>,
    pub provenance: Provenance,
}

impl VersionInfo {
    pub fn new(raw: impl Into<String>, provenance: Provenance) -> Self {
        let raw = raw.into();
        let normalized = normalize(&raw);
        VersionInfo {
            raw,
            normalized,
            provenance,
        }
    }

    pub fn local(raw: impl Into<String>) -> Self {
        VersionInfo::new(raw, Provenance::Local)
    }

    /// True when both sides parse and are equal after normalization.
    pub fn same_release(&self, other: &VersionInfo) -> bool {
        matches!((&self.normalized, &other.normalized), (Some(a), Some(b)) if a == b)
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn serialize_normalized<S>(value: &Option<Version>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(version) => serializer.serialize_some(&version.to_string()),
        None => serializer.serialize_none(),
    }
}
