// Executes an update plan: hands each target's units to the target's driver, in plan order.
// Install and fanout run sequentially so fanout never races the primary install it copies from.

use crate::installers::driver_for;
use crate::libs::context::RunContext;
use crate::log_info;
use crate::schemas::outcomes::{InstallOutcome, UpdatePlan, UpdateUnit};
use colored::Colorize;
use std::path::Path;

/// Detail recorded on every unit skipped by a dry run.
pub const DRY_RUN_DETAIL: &str = "dry-run";

/// Installs `plan.desired` on every unit of the plan.
///
/// In a dry run nothing is executed: every unit is logged and reported as skipped.
pub fn install(plan: &UpdatePlan, artifact: Option<&Path>, ctx: &RunContext) -> Vec<InstallOutcome> {
    if ctx.settings.dry_run {
        return plan
            .units
            .iter()
            .map(|unit| {
                let action = if unit.is_fanout() { "fan out" } else { "install" };
                log_info!(
                    "[DBU::Installer] (dry-run) Would {} {} on {}",
                    action,
                    plan.desired.to_string().green(),
                    unit.label().bold()
                );
                InstallOutcome::skipped(unit, DRY_RUN_DETAIL)
            })
            .collect();
    }

    let driver = driver_for(plan.kind);
    group_by_target(&plan.units)
        .into_iter()
        .flat_map(|units| driver.install(&units, &plan.desired, artifact, ctx))
        .collect()
}

/// Splits units into per-target groups, keeping first-seen order.
fn group_by_target(units: &[UpdateUnit]) -> Vec<Vec<UpdateUnit>> {
    let mut groups: Vec<Vec<UpdateUnit>> = Vec::new();
    for unit in units {
        match groups.iter_mut().find(|group| group[0].target.id == unit.target.id) {
            Some(group) => group.push(unit.clone()),
            None => groups.push(vec![unit.clone()]),
        }
    }
    groups
}
