// This module acts as the central hub for the `installers` layer.
//
// Every `TargetKind` maps onto exactly one driver. The detector, resolver, installer and
// verifier only ever talk to a `&dyn TargetDriver`, so adding a new kind of install surface
// means adding a driver here rather than sprinkling kind checks across the engine.

use crate::libs::context::RunContext;
use crate::libs::errors::UpdateError;
use crate::libs::resolver::LatestSource;
use crate::schemas::config::UpdaterConfig;
use crate::schemas::detection::{InstalledVersion, ProfileState};
use crate::schemas::outcomes::{InstallOutcome, UpdateUnit};
use crate::schemas::targets::{InstallTarget, TargetKind};
use crate::schemas::versions::VersionInfo;
use std::path::Path;

/// Declares the `extension_host` module: VS Code-family editors, including profile fanout.
pub(crate) mod extension_host;

/// Declares the `npm` module: command-line tools installed globally through npm.
pub(crate) mod npm;

/// Kind-specific behavior behind detection, resolution and install.
pub trait TargetDriver: Send + Sync {
    /// Download URL of the installable artifact for `desired`, or `None` when installs fetch
    /// the package themselves.
    fn artifact_url(&self, config: &UpdaterConfig, desired: &VersionInfo) -> Option<String>;

    /// Where the latest published version of this kind's package is looked up.
    fn latest_source(&self, config: &UpdaterConfig) -> LatestSource;

    /// Installed version on one surface of a located target.
    ///
    /// `profile` narrows the lookup to one profile of a profile-aware target; `None` means
    /// the default surface.
    fn installed_version(
        &self,
        target: &InstallTarget,
        invocation: &str,
        profile: Option<&ProfileState>,
        ctx: &RunContext,
    ) -> Result<InstalledVersion, UpdateError>;

    /// Every pre-existing profile of a profile-aware target, default profile first.
    fn discover_profiles(
        &self,
        target: &InstallTarget,
        default_installed: &InstalledVersion,
        ctx: &RunContext,
    ) -> Vec<ProfileState>;

    /// Installs `desired` on `units`, which all belong to one target.
    ///
    /// Returns one outcome per unit: units on the default surface first, then fanout units.
    fn install(
        &self,
        units: &[UpdateUnit],
        desired: &VersionInfo,
        artifact: Option<&Path>,
        ctx: &RunContext,
    ) -> Vec<InstallOutcome>;
}

static EXTENSION_HOST: extension_host::ExtensionHostDriver = extension_host::ExtensionHostDriver;
static NPM: npm::NpmDriver = npm::NpmDriver;

/// The driver responsible for targets of `kind`.
pub fn driver_for(kind: TargetKind) -> &'static dyn TargetDriver {
    match kind {
        TargetKind::ExtensionHost => &EXTENSION_HOST,
        TargetKind::CliPackage => &NPM,
    }
}
