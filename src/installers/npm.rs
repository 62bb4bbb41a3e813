//! # npm Driver
//!
//! Command-line tools installed globally with `npm install -g`. There is no artifact and no
//! profile concept: the package manager fetches the requested version itself.

use crate::installers::TargetDriver;
use crate::libs::context::RunContext;
use crate::libs::detector::{ListedPackage, list_command_version};
use crate::libs::errors::UpdateError;
use crate::libs::resolver::LatestSource;
use crate::libs::version::normalize;
use crate::schemas::config::UpdaterConfig;
use crate::schemas::detection::{InstalledVersion, ProfileState};
use crate::schemas::outcomes::{InstallOutcome, UpdateUnit};
use crate::schemas::targets::InstallTarget;
use crate::schemas::versions::VersionInfo;
use crate::{log_debug, log_error, log_info};
use colored::Colorize;
use std::path::Path;

pub struct NpmDriver;

impl TargetDriver for NpmDriver {
    fn artifact_url(&self, _config: &UpdaterConfig, _desired: &VersionInfo) -> Option<String> {
        None
    }

    fn latest_source(&self, config: &UpdaterConfig) -> LatestSource {
        let package = config.cli_package.name.clone();
        LatestSource::Npm {
            registry_url: config.npm.registry_url.clone(),
            page_url: config.npm.page_url.replace("{package}", &package),
            package,
        }
    }

    fn installed_version(
        &self,
        target: &InstallTarget,
        invocation: &str,
        _profile: Option<&ProfileState>,
        ctx: &RunContext,
    ) -> Result<InstalledVersion, UpdateError> {
        let package = &ctx.config.cli_package.name;

        match list_command_version(target, invocation, package, ctx)? {
            ListedPackage::Version(version) => return Ok(InstalledVersion::Known(version)),
            ListedPackage::Present => return Ok(InstalledVersion::Unknown),
            ListedPackage::Absent => {}
        }

        // Not in npm's global tree; the binary may still come from somewhere else on PATH.
        log_debug!(
            "[DBU::Npm] {} not listed by npm; reading '{} --version'",
            package.cyan(),
            invocation
        );
        Ok(version_command_output(target, invocation, ctx)
            .map(InstalledVersion::Known)
            .unwrap_or_default())
    }

    fn discover_profiles(&self, _target: &InstallTarget, _default_installed: &InstalledVersion, _ctx: &RunContext) -> Vec<ProfileState> {
        Vec::new()
    }

    fn install(
        &self,
        units: &[UpdateUnit],
        desired: &VersionInfo,
        _artifact: Option<&Path>,
        ctx: &RunContext,
    ) -> Vec<InstallOutcome> {
        let package = &ctx.config.cli_package.name;
        let version = desired
            .normalized
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| desired.raw.clone());

        units
            .iter()
            .map(|unit| {
                let vars = [
                    ("cli", unit.invocation.as_str()),
                    ("package", package.as_str()),
                    ("version", version.as_str()),
                ];
                let Some((program, args)) = unit.target.commands.install.render(&vars) else {
                    return InstallOutcome::failed(unit, format!("{} has no install command", unit.target.id), 0);
                };

                log_info!(
                    "[DBU::Npm] Installing {}@{} for {}",
                    package.bold(),
                    version.green(),
                    unit.label()
                );

                let reason = match ctx.runner.run(&program, &args, ctx.settings.install_timeout) {
                    Ok(output) if output.success() => {
                        return InstallOutcome::succeeded(unit, format!("{program} {}", args.join(" ")));
                    }
                    Ok(output) => output.failure_summary(),
                    Err(e) => e.to_string(),
                };

                let err = UpdateError::InstallFailure {
                    unit: unit.label(),
                    reason: reason.clone(),
                };
                log_error!("[DBU::Npm] {}", err);
                InstallOutcome::failed(unit, reason, 1)
            })
            .collect()
    }
}

/// First line of the target's version command, if it parses as a version.
fn version_command_output(target: &InstallTarget, invocation: &str, ctx: &RunContext) -> Option<VersionInfo> {
    let (program, args) = target.commands.version.render(&[("cli", invocation)])?;
    let output = ctx.runner.run(&program, &args, ctx.settings.command_timeout).ok()?;
    if !output.success() {
        return None;
    }
    let line = output.stdout.lines().next()?.trim();
    normalize(line).map(|_| VersionInfo::local(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::test_support::*;
    use crate::schemas::outcomes::InstallStatus;
    use crate::schemas::versions::Provenance;

    fn unit() -> UpdateUnit {
        UpdateUnit {
            target: cli_target(),
            invocation: "prettier".to_string(),
            profile: None,
            installed: InstalledVersion::Known(VersionInfo::local("3.0.0")),
        }
    }

    #[test]
    fn reads_version_from_npm_global_tree() {
        let config = UpdaterConfig::default();
        let runner = FakeRunner::new(|program, _| {
            assert_eq!(program, "npm");
            ok_output("/usr/local/lib\n└── prettier@3.3.3\n")
        });
        let (http, sleeper) = (FakeHttp::new(), RecordingSleeper::default());
        let ctx = context(&config, &runner, &http, &sleeper);

        let installed = NpmDriver.installed_version(&cli_target(), "prettier", None, &ctx).unwrap();

        assert_eq!(installed.version().unwrap().raw, "3.3.3");
    }

    #[test]
    fn falls_back_to_version_command_when_not_listed() {
        let config = UpdaterConfig::default();
        let runner = FakeRunner::new(|program, _| match program {
            "npm" => failed_output(1, ""),
            _ => ok_output("3.2.1\n"),
        });
        let (http, sleeper) = (FakeHttp::new(), RecordingSleeper::default());
        let ctx = context(&config, &runner, &http, &sleeper);

        let installed = NpmDriver.installed_version(&cli_target(), "prettier", None, &ctx).unwrap();

        assert_eq!(installed.version().unwrap().raw, "3.2.1");
        assert_eq!(runner.calls()[1], "prettier --version");
    }

    #[test]
    fn install_pins_the_desired_version() {
        let config = UpdaterConfig::default();
        let runner = FakeRunner::new(|_, _| ok_output("added 1 package"));
        let (http, sleeper) = (FakeHttp::new(), RecordingSleeper::default());
        let ctx = context(&config, &runner, &http, &sleeper);

        let outcomes = NpmDriver.install(&[unit()], &VersionInfo::new("v3.3.3", Provenance::Primary), None, &ctx);

        assert_eq!(outcomes[0].status, InstallStatus::Succeeded);
        assert_eq!(runner.calls(), vec!["npm install -g prettier@3.3.3"]);
    }

    #[test]
    fn failed_install_is_one_attempt() {
        let config = UpdaterConfig::default();
        let runner = FakeRunner::new(|_, _| failed_output(243, "EACCES: permission denied"));
        let (http, sleeper) = (FakeHttp::new(), RecordingSleeper::default());
        let ctx = context(&config, &runner, &http, &sleeper);

        let outcomes = NpmDriver.install(&[unit()], &VersionInfo::new("3.3.3", Provenance::Primary), None, &ctx);

        assert_eq!(outcomes[0].status, InstallStatus::Failed);
        assert_eq!(outcomes[0].attempts, 1);
        assert_eq!(outcomes[0].detail.as_deref(), Some("exit code 243: EACCES: permission denied"));
        assert_eq!(runner.calls().len(), 1);
    }
}
