//! # Extension Host Driver
//!
//! Drives VS Code and its forks. All of them share the same CLI and on-disk layout:
//!
//! - `<cli> --install-extension <file.vsix> --force` installs into the default profile,
//!   materializing `<identifier>-<version>/` in the host's extension store.
//! - Additional profiles live under `<user data>/profiles/<profile>/` and keep their own
//!   extension storage plus an `extensions.json` registry.
//!
//! The primary install never reaches the additional profiles, so after it succeeds the
//! materialized package is fanned out into each selected profile (see `libs::fanout`).

use crate::installers::TargetDriver;
use crate::libs::context::RunContext;
use crate::libs::detector::{ListedPackage, find_package_dir, list_command_version, scan_package_store};
use crate::libs::downloader::artifact_url;
use crate::libs::errors::UpdateError;
use crate::libs::fanout;
use crate::libs::resolver::LatestSource;
use crate::libs::utilities::path_helpers::expand_path;
use crate::libs::utilities::platform::current_marketplace_platform;
use crate::schemas::config::UpdaterConfig;
use crate::schemas::detection::{InstalledVersion, ProfileState};
use crate::schemas::outcomes::{InstallOutcome, UpdateUnit};
use crate::schemas::targets::InstallTarget;
use crate::schemas::versions::VersionInfo;
use crate::{log_debug, log_error, log_info, log_warn};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Identifier of the profile the editor's own install command targets.
pub const DEFAULT_PROFILE_ID: &str = "default";

pub struct ExtensionHostDriver;

impl TargetDriver for ExtensionHostDriver {
    fn artifact_url(&self, config: &UpdaterConfig, desired: &VersionInfo) -> Option<String> {
        Some(artifact_url(
            &config.marketplace.download_url,
            &config.extension,
            desired,
            &current_marketplace_platform(),
        ))
    }

    fn latest_source(&self, config: &UpdaterConfig) -> LatestSource {
        let identifier = config.extension.identifier();
        LatestSource::Gallery {
            query_url: config.marketplace.query_url.clone(),
            item_url: config.marketplace.item_url.replace("{id}", &identifier),
            identifier,
        }
    }

    fn installed_version(
        &self,
        target: &InstallTarget,
        invocation: &str,
        profile: Option<&ProfileState>,
        ctx: &RunContext,
    ) -> Result<InstalledVersion, UpdateError> {
        let identifier = ctx.config.extension.identifier();

        // Additional profiles only ever contain what fanout copied there.
        if let Some(profile) = profile.filter(|p| !p.is_default) {
            return Ok(scan_package_store(&profile.storage_path, &identifier)
                .map(InstalledVersion::Known)
                .unwrap_or_default());
        }

        let store = profile
            .map(|p| p.storage_path.clone())
            .or_else(|| default_store(target));
        let scan = || {
            store
                .as_deref()
                .and_then(|dir| scan_package_store(dir, &identifier))
        };

        if let Some(version) = scan() {
            return Ok(InstalledVersion::Known(version));
        }

        log_debug!(
            "[DBU::ExtensionHost] No package dir for {} in {}; asking the list command",
            identifier.cyan(),
            target.display_name
        );
        Ok(match list_command_version(target, invocation, &identifier, ctx)? {
            ListedPackage::Version(version) => InstalledVersion::Known(version),
            // The store is authoritative; one more look before giving up on the version.
            ListedPackage::Present => scan().map(InstalledVersion::Known).unwrap_or(InstalledVersion::Unknown),
            ListedPackage::Absent => InstalledVersion::NotInstalled,
        })
    }

    fn discover_profiles(
        &self,
        target: &InstallTarget,
        default_installed: &InstalledVersion,
        ctx: &RunContext,
    ) -> Vec<ProfileState> {
        let Some(store) = default_store(target) else {
            log_warn!(
                "[DBU::ExtensionHost] {} is profile-aware but has no storage_dir; skipping profiles",
                target.display_name.yellow()
            );
            return Vec::new();
        };

        let mut profiles = vec![ProfileState {
            id: DEFAULT_PROFILE_ID.to_string(),
            registry_path: store.join(fanout::DEFAULT_REGISTRY_FILE),
            storage_path: store,
            installed: default_installed.clone(),
            is_default: true,
        }];

        let Some(layout) = &target.profiles else {
            return profiles;
        };
        let root = expand_path(&layout.root);
        let Ok(entries) = fs::read_dir(&root) else {
            log_debug!("[DBU::ExtensionHost] No profiles root at {}", root.display());
            return profiles;
        };

        let mut dirs: Vec<PathBuf> = entries.flatten().map(|e| e.path()).filter(|p| p.is_dir()).collect();
        dirs.sort();

        let identifier = ctx.config.extension.identifier();
        for dir in dirs {
            let id = dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let storage_path = dir.join(&layout.storage);
            let installed = scan_package_store(&storage_path, &identifier)
                .map(InstalledVersion::Known)
                .unwrap_or_default();
            profiles.push(ProfileState {
                id,
                storage_path,
                registry_path: dir.join(&layout.registry),
                installed,
                is_default: false,
            });
        }

        log_debug!(
            "[DBU::ExtensionHost] {} has {} profile(s)",
            target.display_name,
            profiles.len()
        );
        profiles
    }

    fn install(
        &self,
        units: &[UpdateUnit],
        desired: &VersionInfo,
        artifact: Option<&Path>,
        ctx: &RunContext,
    ) -> Vec<InstallOutcome> {
        let Some(first) = units.first() else {
            return Vec::new();
        };
        let target = &first.target;
        let invocation = first.invocation.as_str();
        let identifier = ctx.config.extension.identifier();

        let (fanout_units, default_units): (Vec<&UpdateUnit>, Vec<&UpdateUnit>) =
            units.iter().partition(|unit| unit.is_fanout());
        let mut outcomes = Vec::with_capacity(units.len());

        let primary = if default_units.is_empty() {
            // Default profile already current: its package dir is the fanout source.
            if find_materialized(target, &identifier, desired).is_some() {
                Ok(())
            } else {
                log_info!(
                    "[DBU::ExtensionHost] {} has no {} package to fan out; installing into the default profile first",
                    target.display_name.bold(),
                    desired.to_string().green()
                );
                primary_install(target, invocation, artifact, ctx)
            }
        } else {
            let result = primary_install(target, invocation, artifact, ctx);
            for unit in &default_units {
                outcomes.push(match &result {
                    Ok(()) => InstallOutcome::succeeded(unit, format!("installed {desired} via {invocation}")),
                    Err(reason) => InstallOutcome::failed(unit, reason.clone(), 1),
                });
            }
            result
        };

        if fanout_units.is_empty() {
            return outcomes;
        }

        let materialized = primary.and_then(|()| {
            find_materialized(target, &identifier, desired).ok_or_else(|| {
                format!(
                    "no {identifier}-{desired} directory appeared in the {} extension store",
                    target.display_name
                )
            })
        });
        let record_version = desired
            .normalized
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| desired.raw.clone());
        let timestamp = chrono::Utc::now().timestamp_millis();

        for unit in fanout_units {
            let (package_dir, profile) = match (&materialized, &unit.profile) {
                (Err(reason), _) => {
                    outcomes.push(InstallOutcome::failed(
                        unit,
                        format!("fanout not attempted: {reason}"),
                        0,
                    ));
                    continue;
                }
                (Ok(dir), Some(profile)) => (dir, profile),
                (Ok(_), None) => continue,
            };

            let target_platform = fanout::package_target_platform(package_dir, &identifier);
            match fanout::replicate(package_dir, profile, &identifier, &record_version, &target_platform, timestamp) {
                Ok(path) => {
                    log_info!(
                        "[DBU::Fanout] {} -> {}",
                        unit.label().bold(),
                        path.display().to_string().green()
                    );
                    outcomes.push(InstallOutcome::succeeded(unit, format!("fanned out to {}", path.display())));
                }
                Err(e) => {
                    let err = UpdateError::FanoutFailure {
                        profile: unit.label(),
                        reason: e.to_string(),
                    };
                    log_error!("[DBU::Fanout] {}", err);
                    outcomes.push(InstallOutcome::failed(unit, e.to_string(), 1));
                }
            }
        }

        outcomes
    }
}

/// The expanded package store of the default profile.
fn default_store(target: &InstallTarget) -> Option<PathBuf> {
    target.storage_dir.as_deref().map(expand_path)
}

fn find_materialized(target: &InstallTarget, identifier: &str, desired: &VersionInfo) -> Option<PathBuf> {
    find_package_dir(&default_store(target)?, identifier, desired)
}

/// Runs the host's own install command against the artifact.
fn primary_install(
    target: &InstallTarget,
    invocation: &str,
    artifact: Option<&Path>,
    ctx: &RunContext,
) -> Result<(), String> {
    let artifact = artifact
        .map(|p| p.to_string_lossy().to_string())
        .ok_or_else(|| "no artifact available for install".to_string())?;
    let (program, args) = target
        .commands
        .install
        .render(&[("cli", invocation), ("artifact", &artifact)])
        .ok_or_else(|| format!("{} has no install command", target.id))?;

    log_info!(
        "[DBU::ExtensionHost] Installing {} into {}",
        artifact.dimmed(),
        target.display_name.bold()
    );

    let result = match ctx.runner.run(&program, &args, ctx.settings.install_timeout) {
        Ok(output) if output.success() => Ok(()),
        Ok(output) => Err(output.failure_summary()),
        Err(e) => Err(e.to_string()),
    };
    if let Err(reason) = &result {
        let err = UpdateError::InstallFailure {
            unit: target.display_name.clone(),
            reason: reason.clone(),
        };
        log_error!("[DBU::ExtensionHost] {}", err);
    }
    result
}
