//! # Install Target Schema
//!
//! Static descriptors for every surface `devbox-update` knows how to detect and update.
//! A target is pure configuration: it is built once (from the built-in host table or from
//! `config.yaml`) and never mutated during a run.
//!
//! ## Example - YAML override
//!
//! ```yaml
//! targets:
//!   - id: vscode
//!     display_name: Visual Studio Code
//!     kind: extension-host
//!     priority: 10
//!     profile_aware: true
//!     cli: code
//!     detection:
//!       - strategy: command-probe
//!       - strategy: known-path
//!         paths: ["/usr/bin/code"]
//!       - strategy: filesystem-marker
//!         path: ~/.vscode/extensions
//!     commands:
//!       version: ["{cli}", "--version"]
//!       list: ["{cli}", "--list-extensions", "--show-versions"]
//!       install: ["{cli}", "--install-extension", "{artifact}", "--force"]
//!     storage_dir: ~/.vscode/extensions
//!     list_pattern: "(?im)^{id}@(\\S+)$"
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two families of install surface.
///
/// Each variant maps onto exactly one driver (see `installers::driver_for`), so no code
/// outside the driver layer branches on target identifiers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    /// An editor that hosts extensions (VS Code and its forks).
    ExtensionHost,
    /// A command-line tool installed through a package manager.
    CliPackage,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::ExtensionHost => write!(f, "extension-host"),
            TargetKind::CliPackage => write!(f, "cli-package"),
        }
    }
}

/// One step of a target's detection pipeline. Steps run in declared order until one succeeds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum DetectionStrategy {
    /// Run the target's `version` command; exit status 0 means the CLI is invocable.
    CommandProbe,
    /// Check fixed installation paths; the first existing one becomes the invocation path.
    KnownPath { paths: Vec<String> },
    /// A well-known directory whose presence hints the target is installed.
    FilesystemMarker { path: String },
}

/// A command line with `{placeholder}` tokens, e.g. `["{cli}", "--install-extension", "{artifact}"]`.
///
/// Supported placeholders: `{cli}`, `{artifact}`, `{package}`, `{version}`, `{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct CommandTemplate(pub Vec<String>);

impl CommandTemplate {
    pub fn new(parts: &[&str]) -> Self {
        CommandTemplate(parts.iter().map(|p| p.to_string()).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Substitutes placeholders and splits the result into `(program, args)`.
    /// Returns `None` for an empty template.
    pub fn render(&self, vars: &[(&str, &str)]) -> Option<(String, Vec<String>)> {
        let mut rendered = self.0.iter().map(|part| {
            vars.iter().fold(part.clone(), |acc, (key, value)| {
                acc.replace(&format!("{{{key}}}"), value)
            })
        });
        let program = rendered.next()?;
        Some((program, rendered.collect()))
    }
}

/// The command templates a target exposes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CommandTemplates {
    pub version: CommandTemplate,
    pub list: CommandTemplate,
    pub install: CommandTemplate,
}

/// Where an editor keeps its additional (non-default) user profiles.
///
/// `root` contains one directory per profile; `storage` and `registry` are relative to a
/// profile directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileLayout {
    pub root: String,
    #[serde(default = "default_profile_storage")]
    pub storage: String,
    #[serde(default = "default_profile_registry")]
    pub registry: String,
}

fn default_profile_storage() -> String {
    "extensions".to_string()
}

fn default_profile_registry() -> String {
    "extensions.json".to_string()
}

fn default_true() -> bool {
    true
}

/// Static descriptor of one install surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstallTarget {
    pub id: String,
    pub display_name: String,
    pub kind: TargetKind,
    /// Lower is preferred when instances are ranked.
    #[serde(default)]
    pub priority: u32,
    /// Whether installs must be fanned out to every pre-existing profile.
    #[serde(default)]
    pub profile_aware: bool,
    /// Bare command name, used by the command probe and as the `{cli}` fallback.
    pub cli: String,
    pub detection: Vec<DetectionStrategy>,
    pub commands: CommandTemplates,
    /// Package store scanned for `<identifier>-<version>` entries (default profile for editors).
    #[serde(default)]
    pub storage_dir: Option<String>,
    #[serde(default)]
    pub profiles: Option<ProfileLayout>,
    /// Regex applied to the `list` command output; `{id}` is replaced with the escaped identifier.
    /// The first capture group is the version when `list_shows_versions` is true.
    #[serde(default)]
    pub list_pattern: String,
    #[serde(default = "default_true")]
    pub list_shows_versions: bool,
}

impl fmt::Display for InstallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.id)
    }
}
