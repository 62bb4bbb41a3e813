//! # Profile Fanout
//!
//! Editors install an extension into the default profile only. To reach every other
//! profile we replicate what the primary install produced:
//!
//! 1. ensure the profile's extension storage exists,
//! 2. remove stale `<identifier>-<version>` directories,
//! 3. copy the freshly materialized package directory,
//! 4. rewrite the profile's `extensions.json` with exactly one record for the identifier.
//!
//! Fanout never creates profiles. It only writes into profiles the detector found.

use crate::libs::detector::package_dir_version;
use crate::libs::utilities::file_operations::{copy_dir_recursive, remove_dir_if_exists, write_atomic};
use crate::log_debug;
use crate::schemas::detection::ProfileState;
use crate::schemas::registry_file::{ExtensionRecord, UNIVERSAL_PLATFORM, record_id, record_target_platform};
use colored::Colorize;
use regex::Regex;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FanoutError {
    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("registry {path} is not a JSON array of records")]
    MalformedRegistry { path: PathBuf },

    #[error("materialized package {0} has no directory name")]
    UnnamedPackage(PathBuf),
}

/// Registry file inside an extension store.
pub const DEFAULT_REGISTRY_FILE: &str = "extensions.json";

fn io_error<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> FanoutError + 'a {
    move |source| FanoutError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}

/// Replicates `package_dir` into `profile` and registers it. Returns the new package path.
pub fn replicate(
    package_dir: &Path,
    profile: &ProfileState,
    identifier: &str,
    version: &str,
    target_platform: &str,
    installed_timestamp: i64,
) -> Result<PathBuf, FanoutError> {
    let dir_name = package_dir
        .file_name()
        .ok_or_else(|| FanoutError::UnnamedPackage(package_dir.to_path_buf()))?;

    fs::create_dir_all(&profile.storage_path)
        .map_err(io_error("failed to create", &profile.storage_path))?;

    let removed = remove_stale_packages(&profile.storage_path, identifier)?;
    if removed > 0 {
        log_debug!(
            "[DBU::Fanout] Removed {} stale package dir(s) from profile {}",
            removed,
            profile.id.cyan()
        );
    }

    let destination = profile.storage_path.join(dir_name);
    copy_dir_recursive(package_dir, &destination).map_err(io_error("failed to copy into", &destination))?;

    let record = ExtensionRecord::new(identifier, version, target_platform, &destination, installed_timestamp);
    patch_registry(&profile.registry_path, identifier, &record)?;

    Ok(destination)
}

/// Platform the materialized package was built for.
///
/// The editor records its choice in the registry next to the package; an unpacked package
/// also carries it in `.vsixmanifest`. A package with neither is universal.
pub fn package_target_platform(package_dir: &Path, identifier: &str) -> String {
    let from_registry = package_dir
        .parent()
        .map(|store| store.join(DEFAULT_REGISTRY_FILE))
        .and_then(|registry| read_registry(&registry).ok())
        .and_then(|records| {
            records
                .iter()
                .filter(|entry| record_id(entry).is_some_and(|id| id.eq_ignore_ascii_case(identifier)))
                .find_map(|entry| record_target_platform(entry).map(str::to_string))
        });

    from_registry
        .or_else(|| manifest_target_platform(package_dir))
        .unwrap_or_else(|| UNIVERSAL_PLATFORM.to_string())
}

fn manifest_target_platform(package_dir: &Path) -> Option<String> {
    let manifest = fs::read_to_string(package_dir.join(".vsixmanifest")).ok()?;
    let pattern = Regex::new(r#"TargetPlatform="([^"]+)""#).ok()?;
    Some(pattern.captures(&manifest)?.get(1)?.as_str().to_string())
}

/// Deletes every `<identifier>-<version>` directory in `storage`.
pub fn remove_stale_packages(storage: &Path, identifier: &str) -> Result<usize, FanoutError> {
    let entries = fs::read_dir(storage).map_err(io_error("failed to read", storage))?;
    let mut removed = 0;

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if package_dir_version(&name, identifier).is_none() {
            continue;
        }
        let path = entry.path();
        if remove_dir_if_exists(&path).map_err(io_error("failed to remove", &path))? {
            removed += 1;
        }
    }
    Ok(removed)
}

/// Filters every record of `identifier` out of the registry, appends `record` and rewrites
/// the file atomically. Unrelated records are written back exactly as they were read.
///
/// A missing or empty registry file is treated as an empty list. A file that exists but is
/// not a JSON array is left alone and reported.
pub fn patch_registry(registry: &Path, identifier: &str, record: &ExtensionRecord) -> Result<(), FanoutError> {
    let mut records = read_registry(registry)?;
    records.retain(|entry| !record_id(entry).is_some_and(|id| id.eq_ignore_ascii_case(identifier)));

    let fresh = serde_json::to_value(record).map_err(|e| FanoutError::Io {
        action: "failed to serialize record for",
        path: registry.to_path_buf(),
        source: io::Error::other(e),
    })?;
    records.push(fresh);

    let contents = serde_json::to_vec(&records).map_err(|e| FanoutError::Io {
        action: "failed to serialize",
        path: registry.to_path_buf(),
        source: io::Error::other(e),
    })?;
    write_atomic(registry, &contents).map_err(io_error("failed to write", registry))?;

    log_debug!(
        "[DBU::Fanout] Registry {} now holds {} record(s)",
        registry.display().to_string().dimmed(),
        records.len()
    );
    Ok(())
}

fn read_registry(registry: &Path) -> Result<Vec<Value>, FanoutError> {
    let raw = match fs::read_to_string(registry) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error("failed to read", registry)(e)),
    };
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(records)) => Ok(records),
        _ => Err(FanoutError::MalformedRegistry {
            path: registry.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::test_support::make_package_dir;
    use crate::schemas::detection::InstalledVersion;
    use serde_json::json;
    use tempfile::tempdir;

    const ID: &str = "esbenp.prettier-vscode";

    fn profile(root: &Path, id: &str) -> ProfileState {
        let dir = root.join("profiles").join(id);
        ProfileState {
            id: id.to_string(),
            storage_path: dir.join("extensions"),
            registry_path: dir.join("extensions.json"),
            installed: InstalledVersion::NotInstalled,
            is_default: false,
        }
    }

    fn entries_for(registry: &Path, identifier: &str) -> Vec<Value> {
        let records: Vec<Value> = serde_json::from_str(&fs::read_to_string(registry).unwrap()).unwrap();
        records
            .into_iter()
            .filter(|r| record_id(r) == Some(identifier))
            .collect()
    }

    #[test]
    fn both_profiles_end_with_exactly_one_current_entry() {
        let temp = tempdir().unwrap();
        let store = temp.path().join("extensions");
        make_package_dir(&store, "esbenp.prettier-vscode-11.0.0");
        let package = store.join("esbenp.prettier-vscode-11.0.0");

        let a = profile(temp.path(), "a");
        let b = profile(temp.path(), "b");
        fs::create_dir_all(a.storage_path.join("esbenp.prettier-vscode-10.0.0")).unwrap();
        fs::write(
            &a.registry_path,
            json!([
                { "identifier": { "id": ID }, "version": "10.0.0" },
                { "identifier": { "id": "ms-python.python" }, "version": "2024.1.0", "extra": { "kept": true } }
            ])
            .to_string(),
        )
        .unwrap();
        fs::create_dir_all(b.storage_path.parent().unwrap()).unwrap();

        for p in [&a, &b] {
            replicate(&package, p, ID, "11.0.0", UNIVERSAL_PLATFORM, 1_760_870_400_000).unwrap();
        }

        for p in [&a, &b] {
            let entries = entries_for(&p.registry_path, ID);
            assert_eq!(entries.len(), 1, "profile {}", p.id);
            assert_eq!(entries[0]["version"], "11.0.0");
            assert!(p.storage_path.join("esbenp.prettier-vscode-11.0.0/package.json").is_file());
        }

        // Stale copy gone, unrelated record untouched.
        assert!(!a.storage_path.join("esbenp.prettier-vscode-10.0.0").exists());
        let other = entries_for(&a.registry_path, "ms-python.python");
        assert_eq!(other[0], json!({ "identifier": { "id": "ms-python.python" }, "version": "2024.1.0", "extra": { "kept": true } }));
    }

    #[test]
    fn identifier_match_is_case_insensitive() {
        let temp = tempdir().unwrap();
        let registry = temp.path().join("extensions.json");
        fs::write(&registry, json!([{ "identifier": { "id": "Esbenp.Prettier-VSCode" }, "version": "9.0.0" }]).to_string()).unwrap();

        let record = ExtensionRecord::new(ID, "11.0.0", UNIVERSAL_PLATFORM, &temp.path().join("esbenp.prettier-vscode-11.0.0"), 0);
        patch_registry(&registry, ID, &record).unwrap();

        let records: Vec<Value> = serde_json::from_str(&fs::read_to_string(&registry).unwrap()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["version"], "11.0.0");
    }

    #[test]
    fn malformed_registry_is_left_untouched() {
        let temp = tempdir().unwrap();
        let registry = temp.path().join("extensions.json");
        fs::write(&registry, r#"{"not":"an array"}"#).unwrap();

        let record = ExtensionRecord::new(ID, "11.0.0", UNIVERSAL_PLATFORM, &temp.path().join("x-11.0.0"), 0);
        let err = patch_registry(&registry, ID, &record).unwrap_err();

        assert!(matches!(err, FanoutError::MalformedRegistry { .. }));
        assert_eq!(fs::read_to_string(&registry).unwrap(), r#"{"not":"an array"}"#);
    }

    #[test]
    fn unrelated_lookalike_directories_survive() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("esbenp.prettier-vscode-insiders-1.0.0")).unwrap();
        fs::create_dir_all(temp.path().join("esbenp.prettier-vscode-9.0.0")).unwrap();

        assert_eq!(remove_stale_packages(temp.path(), ID).unwrap(), 1);
        assert!(temp.path().join("esbenp.prettier-vscode-insiders-1.0.0").exists());
    }

    #[test]
    fn platform_comes_from_editor_registry_then_manifest() {
        let temp = tempdir().unwrap();
        let store = temp.path().join("extensions");
        make_package_dir(&store, "esbenp.prettier-vscode-11.0.0");
        let package = store.join("esbenp.prettier-vscode-11.0.0");

        assert_eq!(package_target_platform(&package, ID), "universal");

        fs::write(
            package.join(".vsixmanifest"),
            r#"<PackageManifest><Metadata><Identity Id="prettier-vscode" Version="11.0.0" TargetPlatform="linux-arm64" Publisher="esbenp"/></Metadata></PackageManifest>"#,
        )
        .unwrap();
        assert_eq!(package_target_platform(&package, ID), "linux-arm64");

        fs::write(
            store.join("extensions.json"),
            json!([{ "identifier": { "id": ID }, "version": "11.0.0", "metadata": { "targetPlatform": "linux-x64" } }])
                .to_string(),
        )
        .unwrap();
        assert_eq!(package_target_platform(&package, ID), "linux-x64");
    }
}
