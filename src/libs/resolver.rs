//! # Version Resolver
//!
//! Looks up the latest published version of a package. Every source has two strategies:
//!
//! 1. **Primary**: the structured API (marketplace gallery query, npm registry document).
//! 2. **Fallback**: scrape the human-facing package page with an ordered list of patterns.
//!
//! Resolution only fails when both strategies fail. Results are cached per source for the
//! lifetime of the resolver, which is one run.

use crate::libs::context::RunContext;
use crate::libs::errors::UpdateError;
use crate::libs::utilities::platform::current_marketplace_platform;
use crate::libs::version::normalize;
use crate::schemas::versions::{Provenance, VersionInfo};
use crate::{log_debug, log_info, log_warn};
use colored::Colorize;
use regex::Regex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

/// Gallery `filterType` selecting an extension by `publisher.name`.
const FILTER_EXTENSION_NAME: u32 = 7;

/// Gallery flags: include versions, files, version properties, asset URI and statistics,
/// and exclude non-validated versions.
const GALLERY_FLAGS: u32 = 914;

const GALLERY_ACCEPT: &str = "application/json;api-version=3.0-preview.1";
const JSON_ACCEPT: &str = "application/json";
const PAGE_ACCEPT: &str = "text/html,application/xhtml+xml";

/// Fallback extraction patterns, most structured first. The first pattern that matches wins,
/// even when a later one would match something else.
static PAGE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#""version"\s*:\s*"v?(\d+(?:\.\d+)*[^"]*)""#,
        r"(?i)\bVersion\s*:?\s*v?(\d+\.\d+\.\d+)",
        r"\bv(\d+\.\d+\.\d+)\b",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Where the latest version of a package is published.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LatestSource {
    /// An extension marketplace.
    Gallery {
        query_url: String,
        item_url: String,
        identifier: String,
    },
    /// The npm registry.
    Npm {
        registry_url: String,
        page_url: String,
        package: String,
    },
}

impl LatestSource {
    pub fn package(&self) -> &str {
        match self {
            LatestSource::Gallery { identifier, .. } => identifier,
            LatestSource::Npm { package, .. } => package,
        }
    }

    fn page_url(&self) -> &str {
        match self {
            LatestSource::Gallery { item_url, .. } => item_url,
            LatestSource::Npm { page_url, .. } => page_url,
        }
    }
}

/// Resolves and memoizes latest versions.
#[derive(Default)]
pub struct VersionResolver {
    cache: Mutex<HashMap<LatestSource, VersionInfo>>,
}

impl VersionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest published version of `source`'s package.
    pub fn resolve_latest(&self, source: &LatestSource, ctx: &RunContext) -> Result<VersionInfo, UpdateError> {
        if let Some(cached) = self.lock().get(source) {
            log_debug!("[DBU::Resolver] Cache hit for {}", source.package());
            return Ok(cached.clone());
        }

        let primary = match source {
            LatestSource::Gallery {
                query_url,
                identifier,
                ..
            } => query_gallery(query_url, identifier, ctx),
            LatestSource::Npm {
                registry_url,
                package,
                ..
            } => query_npm(registry_url, package, ctx),
        };

        let resolved = match primary {
            Ok(version) => version,
            Err(primary_reason) => {
                log_warn!(
                    "[DBU::Resolver] Primary lookup for {} failed ({}); scraping {}",
                    source.package().yellow(),
                    primary_reason,
                    source.page_url().dimmed()
                );
                scrape_page(source.page_url(), ctx).map_err(|fallback_reason| UpdateError::ResolutionFailure {
                    package: source.package().to_string(),
                    primary: primary_reason,
                    fallback: fallback_reason,
                })?
            }
        };

        log_info!(
            "[DBU::Resolver] Latest {} is {} ({})",
            source.package().bold(),
            resolved.to_string().green(),
            resolved.provenance
        );
        self.lock().insert(source.clone(), resolved.clone());
        Ok(resolved)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<LatestSource, VersionInfo>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// The gallery filter query for one extension.
pub fn gallery_query_body(identifier: &str) -> Value {
    json!({
        "filters": [{
            "criteria": [{ "filterType": FILTER_EXTENSION_NAME, "value": identifier }],
            "pageNumber": 1,
            "pageSize": 1,
            "sortBy": 0,
            "sortOrder": 0
        }],
        "assetTypes": [],
        "flags": GALLERY_FLAGS
    })
}

/// Picks the version from a gallery response.
///
/// Platform-specific extensions publish one entry per platform for the same release; the
/// first entry that is platform-neutral or built for `platform` is preferred, otherwise the
/// first entry is used.
pub fn extract_gallery_version(response: &Value, platform: &str) -> Result<String, String> {
    let versions = response
        .pointer("/results/0/extensions/0/versions")
        .and_then(Value::as_array)
        .filter(|versions| !versions.is_empty())
        .ok_or_else(|| "response has no results[0].extensions[0].versions[0]".to_string())?;

    let compatible = versions.iter().find(|entry| {
        match entry.get("targetPlatform").and_then(Value::as_str) {
            None => true,
            Some(target) => target == "universal" || target == platform,
        }
    });

    compatible
        .unwrap_or(&versions[0])
        .get("version")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|version| !version.is_empty())
        .map(str::to_string)
        .ok_or_else(|| "version field missing or empty".to_string())
}

/// Applies the ordered page patterns; the first pattern with a parseable capture wins.
pub fn extract_version_from_page(body: &str) -> Option<String> {
    PAGE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures_iter(body)
            .filter_map(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
            .find(|candidate| normalize(candidate).is_some())
    })
}

fn query_gallery(query_url: &str, identifier: &str, ctx: &RunContext) -> Result<VersionInfo, String> {
    let response = ctx
        .http
        .post_json(query_url, GALLERY_ACCEPT, &gallery_query_body(identifier), ctx.settings.http_timeout)
        .map_err(|e| e.to_string())?;
    if !response.is_success() {
        return Err(format!("gallery query returned HTTP {}", response.status));
    }

    let document: Value = serde_json::from_slice(&response.body).map_err(|e| format!("invalid gallery JSON: {e}"))?;
    let raw = extract_gallery_version(&document, &current_marketplace_platform())?;
    checked(raw, Provenance::Primary)
}

fn query_npm(registry_url: &str, package: &str, ctx: &RunContext) -> Result<VersionInfo, String> {
    // Scoped packages keep their `@` but escape the slash.
    let url = format!(
        "{}/{}/latest",
        registry_url.trim_end_matches('/'),
        package.replace('/', "%2f")
    );
    let response = ctx
        .http
        .get(&url, JSON_ACCEPT, ctx.settings.http_timeout)
        .map_err(|e| e.to_string())?;
    if !response.is_success() {
        return Err(format!("registry returned HTTP {}", response.status));
    }

    let document: Value = serde_json::from_slice(&response.body).map_err(|e| format!("invalid registry JSON: {e}"))?;
    let raw = document
        .get("version")
        .and_then(Value::as_str)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| "registry document has no version".to_string())?;
    checked(raw.trim().to_string(), Provenance::Primary)
}

fn scrape_page(url: &str, ctx: &RunContext) -> Result<VersionInfo, String> {
    let response = ctx
        .http
        .get(url, PAGE_ACCEPT, ctx.settings.http_timeout)
        .map_err(|e| e.to_string())?;
    if !response.is_success() {
        return Err(format!("page returned HTTP {}", response.status));
    }

    let raw = extract_version_from_page(&response.text()).ok_or_else(|| "no version pattern matched the page".to_string())?;
    checked(raw, Provenance::Fallback)
}

/// Rejects versions that cannot be compared.
fn checked(raw: String, provenance: Provenance) -> Result<VersionInfo, String> {
    let version = VersionInfo::new(raw, provenance);
    match version.normalized {
        Some(_) => Ok(version),
        None => Err(format!("unparseable version '{}'", version.raw)),
    }
}
