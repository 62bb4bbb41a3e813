//! # Detector
//!
//! Finds which targets exist on this machine and what they have installed.
//!
//! Per target, the declared [`DetectionStrategy`] list is walked in order until one strategy
//! locates the target. The winning strategy only decides *how* the target is invoked;
//! installed versions and profiles are always read afterwards by the target's driver.
//!
//! Detection never aborts a run. Each target is probed on its own scoped worker thread with
//! panics caught, so one misbehaving editor CLI only removes that editor from the results.

use crate::installers::driver_for;
use crate::libs::context::RunContext;
use crate::libs::errors::UpdateError;
use crate::libs::utilities::path_helpers::expand_path;
use crate::libs::version::max_version;
use crate::schemas::detection::{DetectedInstance, DetectionMethod};
use crate::schemas::targets::{DetectionStrategy, InstallTarget};
use crate::schemas::versions::VersionInfo;
use crate::{log_debug, log_info, log_warn};
use colored::Colorize;
use regex::Regex;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Detects every target in `targets`, returning the instances found ranked by priority then id.
pub fn detect_all(targets: &[InstallTarget], ctx: &RunContext) -> Vec<DetectedInstance> {
    let found: Mutex<Vec<DetectedInstance>> = Mutex::new(Vec::new());
    let next = AtomicUsize::new(0);
    let workers = ctx.settings.detect_workers.min(targets.len()).max(1);

    log_debug!(
        "[DBU::Detector] Probing {} target(s) on {} worker(s)",
        targets.len(),
        workers
    );

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(target) = targets.get(index) else {
                        break;
                    };

                    match panic::catch_unwind(AssertUnwindSafe(|| detect_target(target, ctx))) {
                        Ok(Ok(Some(instance))) => {
                            found
                                .lock()
                                .unwrap_or_else(|poisoned| poisoned.into_inner())
                                .push(instance);
                        }
                        Ok(Ok(None)) => {
                            log_debug!("[DBU::Detector] {} not found", target.display_name.dimmed());
                        }
                        Ok(Err(err)) => {
                            log_warn!("[DBU::Detector] Skipping {}: {}", target.display_name.yellow(), err);
                        }
                        Err(payload) => {
                            log_warn!(
                                "[DBU::Detector] Skipping {}: detection panicked ({})",
                                target.display_name.yellow(),
                                panic_message(payload.as_ref())
                            );
                        }
                    }
                }
            });
        }
    });

    let mut instances = found.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
    instances.sort_by(|a, b| {
        a.target
            .priority
            .cmp(&b.target.priority)
            .then_with(|| a.target.id.cmp(&b.target.id))
    });
    instances
}

/// Runs one target's detection pipeline.
///
/// `Ok(None)` means no strategy located the target.
pub fn detect_target(target: &InstallTarget, ctx: &RunContext) -> Result<Option<DetectedInstance>, UpdateError> {
    let Some((invocation, method)) = locate(target, ctx) else {
        return Ok(None);
    };

    let driver = driver_for(target.kind);
    let installed = driver.installed_version(target, &invocation, None, ctx)?;
    let profiles = if target.profile_aware {
        driver.discover_profiles(target, &installed, ctx)
    } else {
        Vec::new()
    };

    log_info!(
        "[DBU::Detector] Found {} via {} ({}), installed: {}",
        target.display_name.bold(),
        method.to_string().cyan(),
        invocation.dimmed(),
        installed.to_string().green()
    );

    Ok(Some(DetectedInstance {
        target: target.clone(),
        invocation,
        method,
        installed,
        profiles,
    }))
}

/// Walks the declared strategies; the first that succeeds yields the invocation path.
fn locate(target: &InstallTarget, ctx: &RunContext) -> Option<(String, DetectionMethod)> {
    for strategy in &target.detection {
        match strategy {
            DetectionStrategy::CommandProbe => {
                if probe_command(target, &target.cli, ctx) {
                    return Some((target.cli.clone(), DetectionMethod::CommandProbe));
                }
            }
            DetectionStrategy::KnownPath { paths } => {
                if let Some(path) = paths.iter().map(|p| expand_path(p)).find(|p| p.exists()) {
                    return Some((path.to_string_lossy().to_string(), DetectionMethod::KnownPath));
                }
            }
            DetectionStrategy::FilesystemMarker { path } => {
                if expand_path(path).exists() {
                    // Weakest signal: we know the target was used here, not where its CLI lives.
                    return Some((target.cli.clone(), DetectionMethod::FilesystemMarker));
                }
            }
        }
    }
    None
}

/// Runs the target's version command; exit status 0 means the CLI is invocable.
fn probe_command(target: &InstallTarget, cli: &str, ctx: &RunContext) -> bool {
    let Some((program, args)) = target.commands.version.render(&[("cli", cli)]) else {
        return false;
    };

    match ctx.runner.run(&program, &args, ctx.settings.command_timeout) {
        Ok(output) if output.success() => true,
        Ok(output) => {
            log_debug!(
                "[DBU::Detector] '{}' probe failed: {}",
                program,
                output.failure_summary()
            );
            false
        }
        Err(err) => {
            log_debug!("[DBU::Detector] '{}' probe failed: {}", program, err);
            false
        }
    }
}

/// Returns the version suffix of a package directory named `<identifier>-<version>`.
///
/// The identifier is matched case-insensitively and the suffix must start with a digit,
/// so `publisher.name-insiders-1.0.0` is not mistaken for a version of `publisher.name`.
pub fn package_dir_version<'a>(file_name: &'a str, identifier: &str) -> Option<&'a str> {
    let head = file_name.get(..identifier.len())?;
    if !head.eq_ignore_ascii_case(identifier) {
        return None;
    }
    let suffix = file_name[identifier.len()..].strip_prefix('-')?;
    suffix.starts_with(|c: char| c.is_ascii_digit()).then_some(suffix)
}

/// Every `<identifier>-<version>` directory in `dir` with a parseable version.
pub fn package_dirs(dir: &Path, identifier: &str) -> Vec<(PathBuf, VersionInfo)> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    entries
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let version = VersionInfo::local(package_dir_version(&name, identifier)?);
            version.normalized.is_some().then(|| (entry.path(), version))
        })
        .collect()
}

/// Scans a package store and returns the highest installed version of `identifier`.
///
/// Stale directories left behind by partial uninstalls are common, so every match is
/// considered and the maximum wins.
pub fn scan_package_store(dir: &Path, identifier: &str) -> Option<VersionInfo> {
    max_version(package_dirs(dir, identifier).into_iter().map(|(_, version)| version.raw))
}

/// The package directory in `dir` holding exactly `version` of `identifier`.
pub fn find_package_dir(dir: &Path, identifier: &str, version: &VersionInfo) -> Option<PathBuf> {
    package_dirs(dir, identifier)
        .into_iter()
        .find(|(_, found)| found.same_release(version))
        .map(|(path, _)| path)
}

/// What a target's list command says about a package.
#[derive(Debug, Clone, PartialEq)]
pub enum ListedPackage {
    Version(VersionInfo),
    /// Listed, but without a usable version.
    Present,
    Absent,
}

/// Compiles a target's list pattern, substituting the escaped identifier for `{id}`.
pub fn list_pattern(target: &InstallTarget, identifier: &str) -> Result<Regex, UpdateError> {
    let pattern = target.list_pattern.replace("{id}", &regex::escape(identifier));
    Regex::new(&pattern).map_err(|e| UpdateError::DetectionFailure {
        target: target.id.clone(),
        reason: format!("invalid list pattern '{}': {}", target.list_pattern, e),
    })
}

/// Runs the target's list command and looks for `identifier` in its output.
///
/// A command that cannot be run or exits non-zero counts as "not listed".
pub fn list_command_version(
    target: &InstallTarget,
    invocation: &str,
    identifier: &str,
    ctx: &RunContext,
) -> Result<ListedPackage, UpdateError> {
    let vars = [("cli", invocation), ("package", identifier), ("id", identifier)];
    let Some((program, args)) = target.commands.list.render(&vars) else {
        return Ok(ListedPackage::Absent);
    };
    let pattern = list_pattern(target, identifier)?;

    let output = match ctx.runner.run(&program, &args, ctx.settings.command_timeout) {
        Ok(output) if output.success() => output,
        Ok(output) => {
            log_debug!("[DBU::Detector] List command failed: {}", output.failure_summary());
            return Ok(ListedPackage::Absent);
        }
        Err(err) => {
            log_debug!("[DBU::Detector] List command failed: {}", err);
            return Ok(ListedPackage::Absent);
        }
    };

    let Some(captures) = pattern.captures(&output.stdout) else {
        return Ok(ListedPackage::Absent);
    };
    if !target.list_shows_versions {
        return Ok(ListedPackage::Present);
    }

    Ok(match captures.get(1).map(|m| VersionInfo::local(m.as_str())) {
        Some(version) if version.normalized.is_some() => ListedPackage::Version(version),
        _ => ListedPackage::Present,
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
