//! # Target Registry
//!
//! Builds the catalog of install targets for a run.
//!
//! Extension hosts are VS Code and its forks. They all share one CLI shape
//! (`--version`, `--list-extensions`, `--install-extension`) and one on-disk layout, so
//! instead of one hand-written target per editor there is a small per-host table
//! ([`HostSpec`]) expanded into full [`InstallTarget`] descriptors for the current OS.
//! The CLI package target is derived from the `cli_package` section of the config.
//!
//! `config.yaml` may replace the whole table via `targets:` and drop entries via
//! `disabled_targets:`.

use crate::libs::utilities::platform::detect_os;
use crate::schemas::config::UpdaterConfig;
use crate::schemas::targets::{
    CommandTemplate, CommandTemplates, DetectionStrategy, InstallTarget, ProfileLayout, TargetKind,
};
use crate::{log_debug, log_info};
use colored::Colorize;

/// The per-host facts that differ between VS Code-family editors.
#[derive(Debug, Clone, Copy)]
pub struct HostSpec {
    pub id: &'static str,
    pub display_name: &'static str,
    pub cli: &'static str,
    pub priority: u32,
    /// Shared extension store of the default profile.
    pub extensions_dir: &'static str,
    /// Application directory name under the platform's config root (`Code`, `Cursor`, ...).
    pub app_dir: &'static str,
    /// Whether `--list-extensions --show-versions` prints `id@version`.
    pub list_shows_versions: bool,
    pub macos_paths: &'static [&'static str],
    pub linux_paths: &'static [&'static str],
    pub windows_paths: &'static [&'static str],
}

pub const BUILTIN_HOSTS: &[HostSpec] = &[
    HostSpec {
        id: "vscode",
        display_name: "Visual Studio Code",
        cli: "code",
        priority: 10,
        extensions_dir: "~/.vscode/extensions",
        app_dir: "Code",
        list_shows_versions: true,
        macos_paths: &["/Applications/Visual Studio Code.app/Contents/Resources/app/bin/code"],
        linux_paths: &["/usr/bin/code", "/usr/share/code/bin/code", "/snap/bin/code"],
        windows_paths: &["$LOCALAPPDATA/Programs/Microsoft VS Code/bin/code.cmd"],
    },
    HostSpec {
        id: "cursor",
        display_name: "Cursor",
        cli: "cursor",
        priority: 20,
        extensions_dir: "~/.cursor/extensions",
        app_dir: "Cursor",
        list_shows_versions: true,
        macos_paths: &["/Applications/Cursor.app/Contents/Resources/app/bin/cursor"],
        linux_paths: &["/usr/bin/cursor", "/opt/Cursor/resources/app/bin/cursor"],
        windows_paths: &["$LOCALAPPDATA/Programs/cursor/resources/app/bin/cursor.cmd"],
    },
    HostSpec {
        id: "windsurf",
        display_name: "Windsurf",
        cli: "windsurf",
        priority: 30,
        extensions_dir: "~/.windsurf/extensions",
        app_dir: "Windsurf",
        list_shows_versions: false,
        macos_paths: &["/Applications/Windsurf.app/Contents/Resources/app/bin/windsurf"],
        linux_paths: &["/usr/bin/windsurf", "/usr/share/windsurf/bin/windsurf"],
        windows_paths: &["$LOCALAPPDATA/Programs/Windsurf/bin/windsurf.cmd"],
    },
    HostSpec {
        id: "vscodium",
        display_name: "VSCodium",
        cli: "codium",
        priority: 40,
        extensions_dir: "~/.vscode-oss/extensions",
        app_dir: "VSCodium",
        list_shows_versions: true,
        macos_paths: &["/Applications/VSCodium.app/Contents/Resources/app/bin/codium"],
        linux_paths: &["/usr/bin/codium", "/usr/share/codium/bin/codium", "/snap/bin/codium"],
        windows_paths: &["$LOCALAPPDATA/Programs/VSCodium/bin/codium.cmd"],
    },
];

/// Priority of the CLI package target; after every editor.
const CLI_PACKAGE_PRIORITY: u32 = 100;

/// Where an editor keeps its `User` directory on `os`.
pub fn user_data_dir(app_dir: &str, os: &str) -> String {
    match os {
        "macos" => format!("~/Library/Application Support/{app_dir}/User"),
        "windows" => format!("$APPDATA/{app_dir}/User"),
        _ => format!("~/.config/{app_dir}/User"),
    }
}

impl HostSpec {
    /// Expands this row into a full target for `os`.
    pub fn to_target(&self, os: &str) -> InstallTarget {
        let known_paths = match os {
            "macos" => self.macos_paths,
            "windows" => self.windows_paths,
            _ => self.linux_paths,
        };

        let mut detection = vec![DetectionStrategy::CommandProbe];
        if !known_paths.is_empty() {
            detection.push(DetectionStrategy::KnownPath {
                paths: known_paths.iter().map(|p| p.to_string()).collect(),
            });
        }
        detection.push(DetectionStrategy::FilesystemMarker {
            path: self.extensions_dir.to_string(),
        });

        let list = if self.list_shows_versions {
            CommandTemplate::new(&["{cli}", "--list-extensions", "--show-versions"])
        } else {
            CommandTemplate::new(&["{cli}", "--list-extensions"])
        };
        let list_pattern = if self.list_shows_versions {
            r"(?im)^{id}@(\S+)\s*$"
        } else {
            r"(?im)^{id}\s*$"
        };

        InstallTarget {
            id: self.id.to_string(),
            display_name: self.display_name.to_string(),
            kind: TargetKind::ExtensionHost,
            priority: self.priority,
            profile_aware: true,
            cli: self.cli.to_string(),
            detection,
            commands: CommandTemplates {
                version: CommandTemplate::new(&["{cli}", "--version"]),
                list,
                install: CommandTemplate::new(&["{cli}", "--install-extension", "{artifact}", "--force"]),
            },
            storage_dir: Some(self.extensions_dir.to_string()),
            profiles: Some(ProfileLayout {
                root: format!("{}/profiles", user_data_dir(self.app_dir, os)),
                storage: "extensions".to_string(),
                registry: "extensions.json".to_string(),
            }),
            list_pattern: list_pattern.to_string(),
            list_shows_versions: self.list_shows_versions,
        }
    }
}

/// The npm-installed command-line companion.
pub fn cli_package_target(config: &UpdaterConfig) -> InstallTarget {
    let package = &config.cli_package;
    InstallTarget {
        id: format!("{}-cli", package.name),
        display_name: format!("{} CLI", package.name),
        kind: TargetKind::CliPackage,
        priority: CLI_PACKAGE_PRIORITY,
        profile_aware: false,
        cli: package.binary.clone(),
        detection: vec![DetectionStrategy::CommandProbe],
        commands: CommandTemplates {
            version: CommandTemplate::new(&["{cli}", "--version"]),
            list: CommandTemplate::new(&["npm", "ls", "-g", "{package}", "--depth=0"]),
            install: CommandTemplate::new(&["npm", "install", "-g", "{package}@{version}"]),
        },
        storage_dir: None,
        profiles: None,
        list_pattern: r"(?m)(?:^|[\s─┬└├│])@?{id}@(\S+)".to_string(),
        list_shows_versions: true,
    }
}

/// Every built-in target for `os`, ordered by priority.
pub fn builtin_targets(config: &UpdaterConfig, os: &str) -> Vec<InstallTarget> {
    let mut targets: Vec<InstallTarget> = BUILTIN_HOSTS.iter().map(|host| host.to_target(os)).collect();
    targets.push(cli_package_target(config));
    targets
}

/// The targets of this run: the configured table (or the built-in one), minus disabled ids.
pub fn load_targets(config: &UpdaterConfig) -> Vec<InstallTarget> {
    let mut targets = match &config.targets {
        Some(custom) => {
            log_info!("[DBU::Registry] Using {} target(s) from config", custom.len().to_string().bold());
            custom.clone()
        }
        None => builtin_targets(config, &detect_os()),
    };

    targets.retain(|target| {
        let disabled = config.disabled_targets.iter().any(|id| id == &target.id);
        if disabled {
            log_debug!("[DBU::Registry] Target {} disabled in config", target.id.yellow());
        }
        !disabled
    });
    targets.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
    targets
}
