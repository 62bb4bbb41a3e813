// Loads and validates `config.yaml`.
//
// A missing file is not an error: every field has a default, so a fresh machine can run
// `devbox-update check` before ever calling `generate`. A file that exists but cannot be
// read or parsed, or that describes a target we could never drive, is a run-fatal error.

use crate::libs::errors::ConfigError;
use crate::schemas::config::UpdaterConfig;
use crate::{log_debug, log_info};
use colored::Colorize;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Reads the configuration at `path`, falling back to defaults when it does not exist.
///
/// # Arguments
/// * `path`: The resolved path to `config.yaml`.
///
/// # Returns
/// The parsed and validated `UpdaterConfig`, or a `ConfigError` describing what is wrong.
pub fn load_config(path: &Path) -> Result<UpdaterConfig, ConfigError> {
    if !path.exists() {
        log_info!(
            "No configuration at {}; using built-in defaults",
            path.display().to_string().yellow()
        );
        return Ok(UpdaterConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate(&config)?;
    log_debug!("Loaded configuration from {}", path.display().to_string().green());
    Ok(config)
}

/// Parses YAML; an empty document yields the defaults.
fn parse_config(contents: &str) -> Result<UpdaterConfig, serde_yaml::Error> {
    if contents.trim().is_empty() {
        return Ok(UpdaterConfig::default());
    }
    serde_yaml::from_str(contents)
}

/// Rejects configurations the engine could not act on.
pub fn validate(config: &UpdaterConfig) -> Result<(), ConfigError> {
    if config.extension.publisher.trim().is_empty() || config.extension.name.trim().is_empty() {
        return Err(ConfigError::Invalid("extension.publisher and extension.name must be set".into()));
    }
    if config.cli_package.name.trim().is_empty() {
        return Err(ConfigError::Invalid("cli_package.name must be set".into()));
    }

    let Some(targets) = &config.targets else {
        return Ok(());
    };

    let mut seen = HashSet::new();
    for target in targets {
        if !seen.insert(target.id.as_str()) {
            return Err(ConfigError::Invalid(format!("duplicate target id '{}'", target.id)));
        }
        if target.detection.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "target '{}' has no detection strategies",
                target.id
            )));
        }
        if target.commands.install.is_empty() {
            return Err(ConfigError::Invalid(format!("target '{}' has no install command", target.id)));
        }
        if target.profile_aware && target.storage_dir.is_none() {
            return Err(ConfigError::Invalid(format!(
                "target '{}' is profile-aware but has no storage_dir",
                target.id
            )));
        }

        let pattern = target.list_pattern.replace("{id}", &regex::escape("probe.id"));
        if let Err(e) = Regex::new(&pattern) {
            return Err(ConfigError::Invalid(format!(
                "target '{}' has an invalid list_pattern: {e}",
                target.id
            )));
        }
    }

    Ok(())
}
