//! # Reporting
//!
//! Renders `check` results and update summaries as tables, plus the follow-up notes an
//! operator needs after a partial run: where a retained artifact lives, how to install it by
//! hand, and which editor release the registry patching was modelled on.

use crate::libs::orchestrator::{CheckReport, PlanRun, RunSummary};
use crate::libs::selection::units_of;
use crate::libs::version::installed_needs_update;
use crate::log_warn;
use crate::schemas::detection::InstalledVersion;
use crate::schemas::outcomes::{InstallStatus, UpdateUnit};
use crate::schemas::registry_file::OBSERVED_SCHEMA;
use colored::Colorize;
use prettytable::{Cell, Row, Table, format};

fn header(titles: &[&str]) -> Row {
    Row::new(titles.iter().map(|t| Cell::new(t).style_spec("b")).collect())
}

fn new_table(titles: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(header(titles));
    table
}

/// One row per unit: target, profile, installed, latest, status, how it was found.
pub fn check_table(report: &CheckReport) -> Table {
    let mut table = new_table(&["Target", "Profile", "Installed", "Latest", "Status", "Detected via"]);

    for instance in &report.instances {
        let latest = report.latest.get(&instance.target.kind);
        for unit in units_of(instance) {
            let (status, style) = match (&unit.installed, latest) {
                (InstalledVersion::NotInstalled, _) => ("not installed", "Fy"),
                (_, None) => ("unknown", "Fy"),
                (installed, Some(latest)) if installed_needs_update(installed, latest) => ("update available", "Fy"),
                _ => ("up to date", "Fg"),
            };
            let profile = unit.profile.as_ref().map(|p| p.id.as_str()).unwrap_or("-");
            table.add_row(Row::new(vec![
                Cell::new(&instance.target.display_name),
                Cell::new(profile),
                Cell::new(&unit.installed.to_string()),
                Cell::new(&latest.map(|l| format!("{l} ({})", l.provenance)).unwrap_or_else(|| "-".into())),
                Cell::new(status).style_spec(style),
                Cell::new(&instance.method.to_string()),
            ]));
        }
    }

    table
}

/// One row per unit of every plan: target version, install status, verification, detail, attempts.
pub fn outcome_table(summary: &RunSummary) -> Table {
    let mut table = new_table(&["Unit", "Version", "Status", "Verified", "Detail", "Attempts"]);

    for run in &summary.runs {
        for outcome in &run.install {
            let status_style = match outcome.status {
                InstallStatus::Succeeded => "Fg",
                InstallStatus::Failed => "Fr",
                InstallStatus::Skipped => "Fy",
            };
            let (verified, verified_style) = match run.verification_for(&outcome.unit) {
                Some(v) if v.verified => (format!("yes ({})", v.observed), "Fg"),
                Some(v) => (format!("no ({} after {} attempts)", v.observed, v.attempts), "Fr"),
                None => ("-".to_string(), ""),
            };
            table.add_row(Row::new(vec![
                Cell::new(&outcome.unit.label()),
                Cell::new(&run.plan.desired.to_string()),
                Cell::new(&outcome.status.to_string()).style_spec(status_style),
                Cell::new(&verified).style_spec(verified_style),
                Cell::new(outcome.detail.as_deref().unwrap_or("")),
                Cell::new(&outcome.attempts.to_string()),
            ]));
        }
    }

    table
}

/// Manual-recovery lines for every retained artifact.
pub fn retained_artifact_notes(summary: &RunSummary) -> Vec<String> {
    summary
        .runs
        .iter()
        .filter_map(|run| {
            let path = run.retained_artifact.as_ref()?;
            let mut note = format!("Artifact kept at {}", path.display());
            if let Some(unit) = first_unverified(run) {
                note.push_str(&format!(
                    "; install it manually with: {} --install-extension {} --force",
                    unit.invocation,
                    path.display()
                ));
                if let Some(profile) = unit.profile.as_ref().filter(|_| unit.is_fanout()) {
                    note.push_str(&format!(" --profile {}", profile.id));
                }
            }
            Some(note)
        })
        .collect()
}

/// The first unit that failed verification.
fn first_unverified(run: &PlanRun) -> Option<&UpdateUnit> {
    run.verification.iter().find(|v| !v.verified).map(|v| &v.unit)
}

/// Notice printed whenever fanout rewrote a profile registry.
pub fn schema_notice() -> String {
    format!(
        "Profile registries were patched using the layout observed in {OBSERVED_SCHEMA}. \
         If an editor does not list the extension in a profile, reinstall it from that profile."
    )
}

pub fn print_check(report: &CheckReport) {
    if report.instances.is_empty() {
        log_warn!("[DBU::Report] No supported targets found on this machine");
        return;
    }
    check_table(report).printstd();
}

pub fn print_summary(summary: &RunSummary) {
    if summary.runs.is_empty() {
        println!("{}", "Nothing to update.".green());
        return;
    }

    if summary.dry_run {
        println!("{}", "Dry run: nothing was changed.".yellow().bold());
    }
    outcome_table(summary).printstd();

    for note in retained_artifact_notes(summary) {
        log_warn!("[DBU::Report] {}", note);
    }
    if summary.patched_registries() {
        println!("{}", schema_notice().dimmed());
    }
}
