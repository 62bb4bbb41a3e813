//! # Version Normalization
//!
//! Every comparison in `devbox-update` goes through [`normalize`]. Sources report versions in
//! wildly different shapes (`v11.0.0`, `0.560.0-universal`, `3.4`, `11.0.0 (commit abcdef)`),
//! and a raw string comparison would happily decide that `"9.0.0" > "10.0.0"`.
//!
//! The rules:
//! 1. Surrounding whitespace and a single leading `v`/`V` are stripped.
//! 2. The leading run of dot-separated numeric components is kept (at most three).
//! 3. Missing minor/patch components are padded with `0`.
//! 4. Anything after the numeric prefix (pre-release tags, platform suffixes, build info)
//!    is dropped.
//!
//! A string without a leading numeric component is unparseable and yields `None`.

use crate::schemas::detection::InstalledVersion;
use crate::schemas::versions::VersionInfo;
use semver::Version;

/// Reduces a raw version string to a canonical `semver::Version`.
///
/// Normalization is idempotent: `normalize(normalize(v).to_string()) == normalize(v)`.
pub fn normalize(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    let mut parts: Vec<u64> = Vec::with_capacity(3);
    for component in trimmed.split('.') {
        // Keep the leading digits of this component; stop at the first non-numeric one.
        let digits: String = component.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            break;
        }
        parts.push(digits.parse().ok()?);
        if parts.len() == 3 || digits.len() != component.len() {
            break;
        }
    }

    if parts.is_empty() {
        return None;
    }
    parts.resize(3, 0);
    Some(Version::new(parts[0], parts[1], parts[2]))
}

/// `installed` absent, or `latest` strictly newer after normalization.
///
/// An installed string that does not normalize counts as absent, so the package gets
/// reinstalled. An unparseable `latest` never triggers an update.
pub fn needs_update(installed: Option<&str>, latest: &str) -> bool {
    let Some(latest) = normalize(latest) else {
        return false;
    };
    match installed.and_then(normalize) {
        Some(installed) => latest > installed,
        None => true,
    }
}

/// Same decision as [`needs_update`] over already-detected state.
pub fn installed_needs_update(installed: &InstalledVersion, latest: &VersionInfo) -> bool {
    needs_update(installed.version().map(|v| v.raw.as_str()), &latest.raw)
}

/// True when `installed` normalizes to exactly `expected`.
pub fn matches_expected(installed: &InstalledVersion, expected: &VersionInfo) -> bool {
    installed.version().is_some_and(|v| v.same_release(expected))
}

/// Picks the highest parseable version out of `candidates`, ignoring the rest.
pub fn max_version<I, S>(candidates: I) -> Option<VersionInfo>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    candidates
        .into_iter()
        .map(|raw| VersionInfo::local(raw.as_ref()))
        .filter(|info| info.normalized.is_some())
        .max_by(|a, b| a.normalized.cmp(&b.normalized))
}
