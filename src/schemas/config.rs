//! # Updater Configuration Schema
//!
//! Structure of `~/.devbox-update/config.yaml`. Every section is optional; a missing file or
//! a partial one falls back to the defaults below.
//!
//! ```yaml
//! extension:
//!   publisher: esbenp
//!   name: prettier-vscode
//! cli_package:
//!   name: prettier
//!   binary: prettier
//! retries:
//!   download_attempts: 5
//! disabled_targets: [windsurf]
//! ```

use crate::schemas::targets::{InstallTarget, TargetKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The editor extension kept in sync across every extension host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtensionSpec {
    pub publisher: String,
    pub name: String,
}

impl Default for ExtensionSpec {
    fn default() -> Self {
        ExtensionSpec {
            publisher: "esbenp".to_string(),
            name: "prettier-vscode".to_string(),
        }
    }
}

impl ExtensionSpec {
    /// `publisher.name`, the identifier editors use in package folders and registries.
    pub fn identifier(&self) -> String {
        format!("{}.{}", self.publisher, self.name)
    }
}

/// The npm package providing the companion command-line tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CliPackageSpec {
    pub name: String,
    pub binary: String,
}

impl Default for CliPackageSpec {
    fn default() -> Self {
        CliPackageSpec {
            name: "prettier".to_string(),
            binary: "prettier".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarketplaceConfig {
    pub query_url: String,
    /// `{id}` is replaced with `publisher.name`.
    pub item_url: String,
    /// Placeholders: `{publisher}`, `{name}`, `{version}`, `{platform}`.
    pub download_url: String,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        MarketplaceConfig {
            query_url: "https://marketplace.visualstudio.com/_apis/public/gallery/extensionquery"
                .to_string(),
            item_url: "https://marketplace.visualstudio.com/items?itemName={id}".to_string(),
            download_url: "https://marketplace.visualstudio.com/_apis/public/gallery/publishers/{publisher}/vsextensions/{name}/{version}/vspackage?targetPlatform={platform}".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NpmConfig {
    pub registry_url: String,
    /// `{package}` is replaced with the package name.
    pub page_url: String,
}

impl Default for NpmConfig {
    fn default() -> Self {
        NpmConfig {
            registry_url: "https://registry.npmjs.org".to_string(),
            page_url: "https://www.npmjs.com/package/{package}".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Version probes and list commands.
    pub command_secs: u64,
    /// Install commands.
    pub install_secs: u64,
    /// Every HTTP request.
    pub http_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        TimeoutConfig {
            command_secs: 10,
            install_secs: 60,
            http_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub download_attempts: u32,
    /// Linear backoff base: the wait after failed attempt `n` is `n * download_backoff_ms`.
    pub download_backoff_ms: u64,
    pub verify_attempts: u32,
    /// The wait before verification attempt `n` is `n * verify_delay_ms`.
    pub verify_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            download_attempts: 3,
            download_backoff_ms: 2_000,
            verify_attempts: 3,
            verify_delay_ms: 1_500,
        }
    }
}

/// Top-level `config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpdaterConfig {
    pub extension: ExtensionSpec,
    pub cli_package: CliPackageSpec,
    pub marketplace: MarketplaceConfig,
    pub npm: NpmConfig,
    pub timeouts: TimeoutConfig,
    pub retries: RetryConfig,
    /// Upper bound on concurrent detection workers.
    pub detect_workers: usize,
    /// Where downloaded artifacts are written (and retained after a failed verification).
    pub artifact_dir: String,
    /// Replaces the built-in target table when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<InstallTarget>>,
    /// Target ids to leave out of every run.
    pub disabled_targets: Vec<String>,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        UpdaterConfig {
            extension: ExtensionSpec::default(),
            cli_package: CliPackageSpec::default(),
            marketplace: MarketplaceConfig::default(),
            npm: NpmConfig::default(),
            timeouts: TimeoutConfig::default(),
            retries: RetryConfig::default(),
            detect_workers: 4,
            artifact_dir: "~/.devbox-update/downloads".to_string(),
            targets: None,
            disabled_targets: Vec::new(),
        }
    }
}

impl UpdaterConfig {
    /// The identifier a target of `kind` manages.
    pub fn package_identifier(&self, kind: TargetKind) -> String {
        match kind {
            TargetKind::ExtensionHost => self.extension.identifier(),
            TargetKind::CliPackage => self.cli_package.name.clone(),
        }
    }
}

/// Effective knobs for one run: config values plus command-line flags.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub dry_run: bool,
    pub command_timeout: Duration,
    pub install_timeout: Duration,
    pub http_timeout: Duration,
    pub download_attempts: u32,
    pub download_backoff: Duration,
    pub verify_attempts: u32,
    pub verify_delay: Duration,
    pub detect_workers: usize,
}

impl RunSettings {
    pub fn from_config(config: &UpdaterConfig, dry_run: bool) -> Self {
        RunSettings {
            dry_run,
            command_timeout: Duration::from_secs(config.timeouts.command_secs),
            install_timeout: Duration::from_secs(config.timeouts.install_secs),
            http_timeout: Duration::from_secs(config.timeouts.http_secs),
            download_attempts: config.retries.download_attempts.max(1),
            download_backoff: Duration::from_millis(config.retries.download_backoff_ms),
            verify_attempts: config.retries.verify_attempts.max(1),
            verify_delay: Duration::from_millis(config.retries.verify_delay_ms),
            detect_workers: config.detect_workers.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults_for_missing_sections() {
        let config: UpdaterConfig = serde_yaml::from_str(
            r#"
extension:
  publisher: rust-lang
  name: rust-analyzer
retries:
  download_attempts: 5
"#,
        )
        .unwrap();

        assert_eq!(config.extension.identifier(), "rust-lang.rust-analyzer");
        assert_eq!(config.retries.download_attempts, 5);
        assert_eq!(config.retries.verify_attempts, 3);
        assert_eq!(config.cli_package, CliPackageSpec::default());
        assert_eq!(config.detect_workers, 4);
        assert!(config.targets.is_none());
    }

    #[test]
    fn run_settings_clamp_zero_values() {
        let mut config = UpdaterConfig::default();
        config.retries.download_attempts = 0;
        config.detect_workers = 0;

        let settings = RunSettings::from_config(&config, true);

        assert_eq!(settings.download_attempts, 1);
        assert_eq!(settings.detect_workers, 1);
        assert!(settings.dry_run);
        assert_eq!(settings.download_backoff, Duration::from_millis(2_000));
    }

    #[test]
    fn package_identifier_depends_on_kind() {
        let config = UpdaterConfig::default();
        assert_eq!(
            config.package_identifier(TargetKind::ExtensionHost),
            "esbenp.prettier-vscode"
        );
        assert_eq!(config.package_identifier(TargetKind::CliPackage), "prettier");
    }
}
