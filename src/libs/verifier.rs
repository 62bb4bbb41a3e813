//! # Verifier
//!
//! After install, editors and package managers can take a moment before the new version
//! shows up (extension hosts unpack lazily, npm shims get rewritten). Each successfully
//! installed unit is re-detected until it reports the expected version or the attempt
//! budget runs out. The wait before attempt `n` is `n * verify_delay`.

use crate::installers::driver_for;
use crate::libs::context::RunContext;
use crate::libs::errors::UpdateError;
use crate::libs::version::matches_expected;
use crate::schemas::detection::InstalledVersion;
use crate::schemas::outcomes::{InstallOutcome, InstallStatus, VerificationOutcome};
use crate::schemas::versions::VersionInfo;
use crate::{log_debug, log_info, log_warn};
use colored::Colorize;

/// Verifies every succeeded outcome against `expected`. Failed and skipped units are not
/// verified and produce no verification outcome.
pub fn verify(outcomes: &[InstallOutcome], expected: &VersionInfo, ctx: &RunContext) -> Vec<VerificationOutcome> {
    outcomes
        .iter()
        .filter(|outcome| outcome.status == InstallStatus::Succeeded)
        .map(|outcome| verify_unit(outcome, expected, ctx))
        .collect()
}

fn verify_unit(outcome: &InstallOutcome, expected: &VersionInfo, ctx: &RunContext) -> VerificationOutcome {
    let unit = &outcome.unit;
    let driver = driver_for(unit.target.kind);
    let max_attempts = ctx.settings.verify_attempts;
    let mut observed = InstalledVersion::NotInstalled;

    for attempt in 1..=max_attempts {
        ctx.sleeper.sleep(ctx.settings.verify_delay * attempt);

        observed = match driver.installed_version(&unit.target, &unit.invocation, unit.profile.as_ref(), ctx) {
            Ok(installed) => installed,
            Err(e) => {
                log_debug!("[DBU::Verifier] {} re-detection failed: {}", unit.label(), e);
                InstalledVersion::NotInstalled
            }
        };

        if matches_expected(&observed, expected) {
            log_info!(
                "[DBU::Verifier] {} verified at {} (attempt {})",
                unit.label().bold(),
                observed.to_string().green(),
                attempt
            );
            return VerificationOutcome {
                unit: unit.clone(),
                verified: true,
                observed,
                attempts: attempt,
            };
        }
        log_debug!(
            "[DBU::Verifier] {} reports {} on attempt {}/{}",
            unit.label(),
            observed,
            attempt,
            max_attempts
        );
    }

    let err = UpdateError::VerificationFailure {
        unit: unit.label(),
        expected: expected.to_string(),
        observed: observed.to_string(),
        attempts: max_attempts,
    };
    log_warn!("[DBU::Verifier] {}", err.to_string().yellow());
    VerificationOutcome {
        unit: unit.clone(),
        verified: false,
        observed,
        attempts: max_attempts,
    }
}
