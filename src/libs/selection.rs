//! # Selection
//!
//! Turns detected instances into the units to update, either by asking the operator or by
//! policy. Interactive selection is two-step: first the targets, then, for each chosen
//! profile-aware target with more than one candidate profile, its profiles.

use crate::libs::errors::UpdateError;
use crate::libs::system::Prompter;
use crate::libs::version::installed_needs_update;
use crate::log_info;
use crate::schemas::detection::DetectedInstance;
use crate::schemas::outcomes::UpdateUnit;
use crate::schemas::targets::TargetKind;
use crate::schemas::versions::VersionInfo;
use colored::Colorize;
use std::collections::BTreeMap;

/// Operator flags that shape selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// Skip the target prompt and take every candidate target.
    pub all_targets: bool,
    /// Skip the profile prompts and take every candidate profile.
    pub all_profiles: bool,
    /// Include units that are already at the latest version.
    pub force: bool,
    /// Never prompt (`--yes`, or stdin is not a terminal).
    pub non_interactive: bool,
}

/// Every unit of `instance`: one per profile for profile-aware targets, otherwise one.
pub fn units_of(instance: &DetectedInstance) -> Vec<UpdateUnit> {
    if instance.target.profile_aware && !instance.profiles.is_empty() {
        return instance
            .profiles
            .iter()
            .map(|profile| UpdateUnit {
                target: instance.target.clone(),
                invocation: instance.invocation.clone(),
                profile: Some(profile.clone()),
                installed: profile.installed.clone(),
            })
            .collect();
    }

    vec![UpdateUnit {
        target: instance.target.clone(),
        invocation: instance.invocation.clone(),
        profile: None,
        installed: instance.installed.clone(),
    }]
}

/// Units of `instance` that should be offered for update.
pub fn candidate_units(instance: &DetectedInstance, desired: &VersionInfo, force: bool) -> Vec<UpdateUnit> {
    units_of(instance)
        .into_iter()
        .filter(|unit| force || installed_needs_update(&unit.installed, desired))
        .collect()
}

/// Chooses the units to update.
///
/// `desired` holds the resolved latest version per target kind; instances of a kind
/// without a resolved version are never selected.
pub fn select_units(
    instances: &[DetectedInstance],
    desired: &BTreeMap<TargetKind, VersionInfo>,
    policy: SelectionPolicy,
    prompter: &dyn Prompter,
) -> Result<Vec<UpdateUnit>, UpdateError> {
    let candidates: Vec<(&DetectedInstance, Vec<UpdateUnit>)> = instances
        .iter()
        .filter_map(|instance| {
            let latest = desired.get(&instance.target.kind)?;
            let units = candidate_units(instance, latest, policy.force);
            (!units.is_empty()).then_some((instance, units))
        })
        .collect();

    if candidates.is_empty() {
        log_info!("[DBU::Selection] Everything is up to date");
        return Ok(Vec::new());
    }

    let chosen_targets: Vec<usize> = if policy.all_targets || policy.non_interactive {
        (0..candidates.len()).collect()
    } else {
        let items: Vec<String> = candidates
            .iter()
            .map(|(instance, _)| target_item(instance, &desired[&instance.target.kind]))
            .collect();
        let defaults = vec![true; items.len()];
        prompter.multi_select("Select targets to update", &items, &defaults)?
    };

    let mut selected = Vec::new();
    for index in chosen_targets {
        let Some((instance, units)) = candidates.get(index) else {
            continue;
        };

        if units.len() <= 1 || policy.all_profiles || policy.non_interactive {
            selected.extend(units.iter().cloned());
            continue;
        }

        let items: Vec<String> = units.iter().map(|unit| format!("{} ({})", unit.label(), unit.installed)).collect();
        let defaults = vec![true; items.len()];
        let prompt = format!("Select {} profiles to update", instance.target.display_name);
        for choice in prompter.multi_select(&prompt, &items, &defaults)? {
            if let Some(unit) = units.get(choice) {
                selected.push(unit.clone());
            }
        }
    }

    log_info!("[DBU::Selection] {} unit(s) selected", selected.len().to_string().bold());
    Ok(selected)
}

fn target_item(instance: &DetectedInstance, latest: &VersionInfo) -> String {
    format!(
        "{} ({} -> {})",
        instance.target.display_name, instance.installed, latest
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::test_support::*;
    use crate::schemas::detection::{DetectionMethod, InstalledVersion, ProfileState};
    use crate::schemas::versions::Provenance;
    use std::path::{Path, PathBuf};

    fn profile(id: &str, installed: &str, is_default: bool) -> ProfileState {
        ProfileState {
            id: id.to_string(),
            storage_path: PathBuf::from(format!("/p/{id}/extensions")),
            registry_path: PathBuf::from(format!("/p/{id}/extensions.json")),
            installed: InstalledVersion::Known(VersionInfo::local(installed)),
            is_default,
        }
    }

    fn editor() -> DetectedInstance {
        DetectedInstance {
            target: editor_target(Path::new("/p")),
            invocation: "testcode".to_string(),
            method: DetectionMethod::CommandProbe,
            installed: InstalledVersion::Known(VersionInfo::local("11.0.0")),
            profiles: vec![
                profile("default", "11.0.0", true),
                profile("work", "10.0.0", false),
                profile("play", "9.0.0", false),
            ],
        }
    }

    fn cli() -> DetectedInstance {
        DetectedInstance {
            target: cli_target(),
            invocation: "prettier".to_string(),
            method: DetectionMethod::CommandProbe,
            installed: InstalledVersion::Known(VersionInfo::local("3.3.3")),
            profiles: Vec::new(),
        }
    }

    fn desired() -> BTreeMap<TargetKind, VersionInfo> {
        BTreeMap::from([
            (TargetKind::ExtensionHost, VersionInfo::new("11.0.0", Provenance::Primary)),
            (TargetKind::CliPackage, VersionInfo::new("3.3.3", Provenance::Primary)),
        ])
    }

    fn labels(units: &[UpdateUnit]) -> Vec<String> {
        units.iter().map(UpdateUnit::label).collect()
    }

    #[test]
    fn policy_selects_only_outdated_units() {
        let policy = SelectionPolicy {
            non_interactive: true,
            ..Default::default()
        };
        let prompter = ScriptedPrompter::new(vec![]);

        let units = select_units(&[editor(), cli()], &desired(), policy, &prompter).unwrap();

        assert_eq!(labels(&units), vec!["Test Code [work]", "Test Code [play]"]);
        assert!(prompter.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn force_includes_current_units() {
        let policy = SelectionPolicy {
            non_interactive: true,
            force: true,
            ..Default::default()
        };

        let units = select_units(&[editor(), cli()], &desired(), policy, &ScriptedPrompter::new(vec![])).unwrap();

        assert_eq!(units.len(), 4);
    }

    #[test]
    fn interactive_selection_prompts_targets_then_profiles() {
        let policy = SelectionPolicy {
            force: true,
            ..Default::default()
        };
        // Targets: pick the editor only. Profiles: pick "work" only.
        let prompter = ScriptedPrompter::new(vec![vec![0], vec![1]]);

        let units = select_units(&[editor(), cli()], &desired(), policy, &prompter).unwrap();

        assert_eq!(labels(&units), vec!["Test Code [work]"]);
        assert_eq!(
            *prompter.prompts.lock().unwrap(),
            vec!["Select targets to update", "Select Test Code profiles to update"]
        );
    }

    #[test]
    fn all_profiles_skips_profile_prompt() {
        let policy = SelectionPolicy {
            all_profiles: true,
            ..Default::default()
        };
        let prompter = ScriptedPrompter::new(vec![vec![0]]);

        let units = select_units(&[editor()], &desired(), policy, &prompter).unwrap();

        assert_eq!(units.len(), 2);
        assert_eq!(prompter.prompts.lock().unwrap().len(), 1);
    }
}
