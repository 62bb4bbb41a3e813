// Runtime detection results. Rebuilt from scratch on every run by the detector.

use crate::schemas::targets::InstallTarget;
use crate::schemas::versions::VersionInfo;
use std::fmt;
use std::path::PathBuf;

/// Which detection strategy located an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMethod {
    CommandProbe,
    KnownPath,
    FilesystemMarker,
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionMethod::CommandProbe => write!(f, "command-probe"),
            DetectionMethod::KnownPath => write!(f, "known-path"),
            DetectionMethod::FilesystemMarker => write!(f, "filesystem-marker"),
        }
    }
}

/// What we know about a package on one install surface.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InstalledVersion {
    #[default]
    NotInstalled,
    /// The package is present but no source reported a usable version.
    Unknown,
    Known(VersionInfo),
}

impl InstalledVersion {
    pub fn version(&self) -> Option<&VersionInfo> {
        match self {
            InstalledVersion::Known(version) => Some(version),
            _ => None,
        }
    }
}

impl fmt::Display for InstalledVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstalledVersion::NotInstalled => write!(f, "not installed"),
            InstalledVersion::Unknown => write!(f, "present (version unknown)"),
            InstalledVersion::Known(version) => write!(f, "{version}"),
        }
    }
}

/// One user profile of an extension host.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileState {
    pub id: String,
    /// Directory holding `<identifier>-<version>` package folders for this profile.
    pub storage_path: PathBuf,
    /// The profile's `extensions.json`.
    pub registry_path: PathBuf,
    pub installed: InstalledVersion,
    pub is_default: bool,
}

/// A target found on this machine.
#[derive(Debug, Clone)]
pub struct DetectedInstance {
    pub target: InstallTarget,
    /// Command or absolute path used to invoke the target's CLI.
    pub invocation: String,
    pub method: DetectionMethod,
    /// Installed version on the default surface.
    pub installed: InstalledVersion,
    /// Empty for targets that are not profile-aware.
    pub profiles: Vec<ProfileState>,
}
