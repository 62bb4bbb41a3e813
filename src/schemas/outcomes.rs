//! Plan and outcome types flowing from selection through install and verification.

use crate::schemas::detection::{InstalledVersion, ProfileState};
use crate::schemas::targets::{InstallTarget, TargetKind};
use crate::schemas::versions::VersionInfo;
use std::fmt;

/// One (target, profile?) pair. The smallest thing that can succeed or fail on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateUnit {
    pub target: InstallTarget,
    pub invocation: String,
    /// `None` for targets that are not profile-aware.
    pub profile: Option<ProfileState>,
    pub installed: InstalledVersion,
}

impl UpdateUnit {
    /// Human-readable unit name, e.g. `Cursor [work]` or `prettier CLI`.
    pub fn label(&self) -> String {
        match &self.profile {
            Some(profile) => format!("{} [{}]", self.target.display_name, profile.id),
            None => self.target.display_name.clone(),
        }
    }

    /// True for profiles reached by fanout rather than by the primary install command.
    pub fn is_fanout(&self) -> bool {
        self.profile.as_ref().is_some_and(|p| !p.is_default)
    }
}

impl fmt::Display for UpdateUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Units sharing one desired version. Every unit of a plan has the same target kind,
/// so a plan needs at most one artifact.
#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub kind: TargetKind,
    pub desired: VersionInfo,
    pub units: Vec<UpdateUnit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallStatus::Succeeded => write!(f, "succeeded"),
            InstallStatus::Failed => write!(f, "failed"),
            InstallStatus::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub unit: UpdateUnit,
    pub status: InstallStatus,
    pub detail: Option<String>,
    pub attempts: u32,
}

impl InstallOutcome {
    pub fn succeeded(unit: &UpdateUnit, detail: impl Into<String>) -> Self {
        InstallOutcome {
            unit: unit.clone(),
            status: InstallStatus::Succeeded,
            detail: Some(detail.into()),
            attempts: 1,
        }
    }

    pub fn failed(unit: &UpdateUnit, detail: impl Into<String>, attempts: u32) -> Self {
        InstallOutcome {
            unit: unit.clone(),
            status: InstallStatus::Failed,
            detail: Some(detail.into()),
            attempts,
        }
    }

    pub fn skipped(unit: &UpdateUnit, detail: impl Into<String>) -> Self {
        InstallOutcome {
            unit: unit.clone(),
            status: InstallStatus::Skipped,
            detail: Some(detail.into()),
            attempts: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub unit: UpdateUnit,
    pub verified: bool,
    pub observed: InstalledVersion,
    pub attempts: u32,
}
