//! # Update Orchestrator
//!
//! Drives one run end to end:
//!
//! ```text
//! targets -> detect -> resolve latest -> select -> download -> install/fanout -> verify -> summary
//! ```
//!
//! Everything up to and including the downloads is run-fatal: a failure aborts the run
//! before any install command runs, so the machine is left untouched. From the first
//! install on, failures are scoped to a unit and collected into the [`RunSummary`].

use crate::installers::driver_for;
use crate::libs::context::RunContext;
use crate::libs::detector::detect_all;
use crate::libs::downloader::{Artifact, artifact_file_name, download_artifact};
use crate::libs::errors::UpdateError;
use crate::libs::installer;
use crate::libs::resolver::VersionResolver;
use crate::libs::selection::{SelectionPolicy, select_units};
use crate::libs::system::Prompter;
use crate::libs::utilities::path_helpers::expand_path;
use crate::libs::verifier;
use crate::schemas::detection::DetectedInstance;
use crate::schemas::outcomes::{InstallOutcome, InstallStatus, UpdatePlan, UpdateUnit, VerificationOutcome};
use crate::schemas::targets::{InstallTarget, TargetKind};
use crate::schemas::versions::VersionInfo;
use crate::{log_info, log_warn};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Exit status of a fully successful run.
pub const EXIT_OK: i32 = 0;
/// Exit status of a run aborted by a run-fatal error.
pub const EXIT_FATAL: i32 = 1;
/// Exit status of a run that completed with unit-scoped failures.
pub const EXIT_PARTIAL: i32 = 2;

/// What `check` found: detected instances and the latest version per kind.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub instances: Vec<DetectedInstance>,
    pub latest: BTreeMap<TargetKind, VersionInfo>,
}

/// Outcome of one plan (all units of one target kind).
#[derive(Debug)]
pub struct PlanRun {
    pub plan: UpdatePlan,
    pub install: Vec<InstallOutcome>,
    pub verification: Vec<VerificationOutcome>,
    /// Artifact kept on disk because verification failed.
    pub retained_artifact: Option<PathBuf>,
}

impl PlanRun {
    /// Verification outcome of `unit`, if it was verified.
    pub fn verification_for(&self, unit: &UpdateUnit) -> Option<&VerificationOutcome> {
        self.verification.iter().find(|v| v.unit == *unit)
    }

    /// Whether fanout rewrote at least one profile registry.
    pub fn patched_registries(&self) -> bool {
        self.install
            .iter()
            .any(|o| o.status == InstallStatus::Succeeded && o.unit.is_fanout())
    }

    fn has_failures(&self) -> bool {
        self.install.iter().any(|o| o.status == InstallStatus::Failed)
            || self.verification.iter().any(|v| !v.verified)
    }
}

/// Aggregated result of an update run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub dry_run: bool,
    pub runs: Vec<PlanRun>,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.runs.iter().any(PlanRun::has_failures)
    }

    pub fn exit_code(&self) -> i32 {
        if self.has_failures() { EXIT_PARTIAL } else { EXIT_OK }
    }

    pub fn patched_registries(&self) -> bool {
        self.runs.iter().any(PlanRun::patched_registries)
    }
}

/// Detects every target and resolves the latest version of each kind found. Mutates nothing.
pub fn run_check(targets: &[InstallTarget], ctx: &RunContext) -> Result<CheckReport, UpdateError> {
    let resolver = VersionResolver::new();
    let instances = detect_all(targets, ctx);
    let latest = resolve_latest_versions(&instances, &resolver, ctx)?;
    Ok(CheckReport { instances, latest })
}

/// Runs a full update.
pub fn run_update(
    targets: &[InstallTarget],
    policy: SelectionPolicy,
    prompter: &dyn Prompter,
    ctx: &RunContext,
) -> Result<RunSummary, UpdateError> {
    let mut summary = RunSummary {
        dry_run: ctx.settings.dry_run,
        runs: Vec::new(),
    };

    let resolver = VersionResolver::new();
    let instances = detect_all(targets, ctx);
    if instances.is_empty() {
        log_warn!("[DBU::Orchestrator] No supported targets found on this machine");
        return Ok(summary);
    }

    let latest = resolve_latest_versions(&instances, &resolver, ctx)?;
    let units = select_units(&instances, &latest, policy, prompter)?;
    let plans = build_plans(units, &latest);
    if plans.is_empty() {
        return Ok(summary);
    }

    // Acquire every artifact before the first install so a download failure leaves nothing
    // half-updated. Artifacts already fetched are cleaned up by their guards on the way out.
    let mut staged = Vec::with_capacity(plans.len());
    for plan in plans {
        let artifact = acquire_artifact(&plan, ctx)?;
        staged.push((plan, artifact));
    }

    for (plan, artifact) in staged {
        log_info!(
            "[DBU::Orchestrator] Updating {} unit(s) to {}",
            plan.units.len().to_string().bold(),
            plan.desired.to_string().green()
        );

        let install = installer::install(&plan, artifact.as_ref().map(Artifact::path), ctx);
        let verification = if ctx.settings.dry_run {
            Vec::new()
        } else {
            verifier::verify(&install, &plan.desired, ctx)
        };

        let retained_artifact = if verification.iter().any(|v| !v.verified) {
            artifact.map(Artifact::retain)
        } else {
            None
        };

        summary.runs.push(PlanRun {
            plan,
            install,
            verification,
            retained_artifact,
        });
    }

    Ok(summary)
}

/// Latest version per kind present among `instances`. A lookup failure is run-fatal.
fn resolve_latest_versions(
    instances: &[DetectedInstance],
    resolver: &VersionResolver,
    ctx: &RunContext,
) -> Result<BTreeMap<TargetKind, VersionInfo>, UpdateError> {
    let mut latest = BTreeMap::new();
    for instance in instances {
        let kind = instance.target.kind;
        if latest.contains_key(&kind) {
            continue;
        }
        let source = driver_for(kind).latest_source(ctx.config);
        latest.insert(kind, resolver.resolve_latest(&source, ctx)?);
    }
    Ok(latest)
}

/// Groups selected units into one plan per kind.
fn build_plans(units: Vec<UpdateUnit>, latest: &BTreeMap<TargetKind, VersionInfo>) -> Vec<UpdatePlan> {
    let mut by_kind: BTreeMap<TargetKind, Vec<UpdateUnit>> = BTreeMap::new();
    for unit in units {
        by_kind.entry(unit.target.kind).or_default().push(unit);
    }

    by_kind
        .into_iter()
        .filter_map(|(kind, units)| {
            Some(UpdatePlan {
                kind,
                desired: latest.get(&kind)?.clone(),
                units,
            })
        })
        .collect()
}

/// Downloads the plan's artifact, if its kind installs from one.
fn acquire_artifact(plan: &UpdatePlan, ctx: &RunContext) -> Result<Option<Artifact>, UpdateError> {
    let Some(url) = driver_for(plan.kind).artifact_url(ctx.config, &plan.desired) else {
        return Ok(None);
    };

    if ctx.settings.dry_run {
        log_info!("[DBU::Orchestrator] (dry-run) Would download {}", url.cyan());
        return Ok(None);
    }

    let identifier = ctx.config.package_identifier(plan.kind);
    let destination = expand_path(&ctx.config.artifact_dir).join(artifact_file_name(&identifier, &plan.desired));
    let artifact = download_artifact(&url, &destination, ctx)?;
    if artifact.attempts() > 1 {
        log_warn!(
            "[DBU::Orchestrator] {} needed {} download attempts",
            artifact.path().display(),
            artifact.attempts()
        );
    }
    Ok(Some(artifact))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::downloader::artifact_url;
    use crate::libs::test_support::*;
    use crate::libs::utilities::platform::current_marketplace_platform;
    use crate::schemas::config::UpdaterConfig;
    use crate::schemas::versions::Provenance;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const GALLERY_RESPONSE: &str = r#"{"results":[{"extensions":[{"versions":[{"version":"11.0.0"}]}]}]}"#;

    fn config_in(root: &Path) -> UpdaterConfig {
        let mut config = UpdaterConfig::default();
        config.artifact_dir = root.join("downloads").to_string_lossy().to_string();
        config
    }

    fn download_url(config: &UpdaterConfig) -> String {
        artifact_url(
            &config.marketplace.download_url,
            &config.extension,
            &VersionInfo::new("11.0.0", Provenance::Primary),
            &current_marketplace_platform(),
        )
    }

    fn artifact_path(config: &UpdaterConfig) -> PathBuf {
        PathBuf::from(&config.artifact_dir).join("esbenp.prettier-vscode-11.0.0.vsix")
    }

    /// An editor whose install command materializes the package when `materialize` is set.
    fn editor_runner(root: &Path, materialize: bool) -> FakeRunner {
        let store = root.join("extensions");
        FakeRunner::new(move |_, args| {
            if materialize && args.iter().any(|a| a == "--install-extension") {
                make_package_dir(&store, "esbenp.prettier-vscode-11.0.0");
            }
            if args.iter().any(|a| a == "--version") {
                return ok_output("1.96.0\n");
            }
            ok_output("")
        })
    }

    fn non_interactive() -> SelectionPolicy {
        SelectionPolicy {
            non_interactive: true,
            ..Default::default()
        }
    }

    #[test]
    fn full_run_installs_fans_out_verifies_and_cleans_up() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("profiles/work")).unwrap();
        let config = config_in(temp.path());
        let runner = editor_runner(temp.path(), true);
        let http = FakeHttp::new()
            .respond(&config.marketplace.query_url, 200, GALLERY_RESPONSE)
            .respond(&download_url(&config), 200, "PK-vsix-bytes");
        let sleeper = RecordingSleeper::default();
        let ctx = context(&config, &runner, &http, &sleeper);

        let summary = run_update(
            &[editor_target(temp.path())],
            non_interactive(),
            &ScriptedPrompter::new(vec![]),
            &ctx,
        )
        .unwrap();

        assert_eq!(summary.exit_code(), EXIT_OK);
        let run = &summary.runs[0];
        assert_eq!(run.install.len(), 2);
        assert!(run.verification.iter().all(|v| v.verified));
        assert!(summary.patched_registries());
        assert!(run.retained_artifact.is_none());
        assert!(!artifact_path(&config).exists());
        assert!(
            temp.path()
                .join("profiles/work/extensions/esbenp.prettier-vscode-11.0.0")
                .is_dir()
        );
    }

    #[test]
    fn verification_failure_retains_the_artifact() {
        let temp = tempdir().unwrap();
        let config = config_in(temp.path());
        let runner = editor_runner(temp.path(), false);
        let http = FakeHttp::new()
            .respond(&config.marketplace.query_url, 200, GALLERY_RESPONSE)
            .respond(&download_url(&config), 200, "PK-vsix-bytes");
        let sleeper = RecordingSleeper::default();
        let ctx = context(&config, &runner, &http, &sleeper);

        let summary = run_update(
            &[editor_target(temp.path())],
            non_interactive(),
            &ScriptedPrompter::new(vec![]),
            &ctx,
        )
        .unwrap();

        assert_eq!(summary.exit_code(), EXIT_PARTIAL);
        let run = &summary.runs[0];
        assert_eq!(run.install[0].status, InstallStatus::Succeeded);
        assert!(!run.verification[0].verified);
        assert_eq!(run.verification[0].attempts, 3);
        assert_eq!(run.retained_artifact.as_deref(), Some(artifact_path(&config).as_path()));
        assert!(artifact_path(&config).is_file());
    }

    #[test]
    fn download_failure_is_fatal_before_any_install() {
        let temp = tempdir().unwrap();
        let config = config_in(temp.path());
        let runner = editor_runner(temp.path(), true);
        let url = download_url(&config);
        let http = FakeHttp::new()
            .respond(&config.marketplace.query_url, 200, GALLERY_RESPONSE)
            .respond(&url, 500, "")
            .respond(&url, 500, "")
            .respond(&url, 500, "");
        let sleeper = RecordingSleeper::default();
        let ctx = context(&config, &runner, &http, &sleeper);

        let err = run_update(
            &[editor_target(temp.path())],
            non_interactive(),
            &ScriptedPrompter::new(vec![]),
            &ctx,
        )
        .unwrap_err();

        assert!(matches!(err, UpdateError::DownloadFailure { attempts: 3, .. }));
        assert!(
            runner
                .calls()
                .iter()
                .all(|call| !call.contains("--install-extension"))
        );
    }

    #[test]
    fn dry_run_mutates_nothing() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("profiles/work")).unwrap();
        let config = config_in(temp.path());
        let runner = editor_runner(temp.path(), true);
        let http = FakeHttp::new().respond(&config.marketplace.query_url, 200, GALLERY_RESPONSE);
        let sleeper = RecordingSleeper::default();
        let mut ctx = context(&config, &runner, &http, &sleeper);
        ctx.settings.dry_run = true;

        let summary = run_update(
            &[editor_target(temp.path())],
            non_interactive(),
            &ScriptedPrompter::new(vec![]),
            &ctx,
        )
        .unwrap();

        assert_eq!(summary.exit_code(), EXIT_OK);
        assert!(summary.runs[0].install.iter().all(|o| o.status == InstallStatus::Skipped));
        assert!(summary.runs[0].verification.is_empty());
        assert_eq!(http.requests(), vec![format!("POST {}", config.marketplace.query_url)]);
        assert!(!temp.path().join("extensions").exists());
        assert!(!temp.path().join("profiles/work/extensions").exists());
        assert!(!temp.path().join("downloads").exists());
    }

    #[test]
    fn resolution_failure_aborts_before_install() {
        let temp = tempdir().unwrap();
        let config = config_in(temp.path());
        let runner = editor_runner(temp.path(), false);
        let http = FakeHttp::new();
        let sleeper = RecordingSleeper::default();
        let ctx = context(&config, &runner, &http, &sleeper);

        let err = run_check(&[editor_target(temp.path())], &ctx).unwrap_err();

        assert!(matches!(err, UpdateError::ResolutionFailure { .. }));
        assert!(runner.calls().iter().all(|call| !call.contains("--install-extension")));
    }
}
