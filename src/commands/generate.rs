// src/commands/generate.rs
// Writes a default `config.yaml` so a new user can see every knob `devbox-update` has.
// The body is the serialized default configuration, so it can never drift from the
// defaults the loader applies.

use crate::libs::orchestrator::EXIT_OK;
use crate::libs::paths::resolve_config_path;
use crate::schemas::config::UpdaterConfig;
use crate::{log_debug, log_info};
use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;

/// Comment block placed above the serialized defaults.
const HEADER: &str = "\
# devbox-update configuration
#
# Every field is optional; anything left out falls back to the value shown here.
# Paths accept `~` and environment variables.
#
# `targets` is omitted on purpose: without it the built-in table (VS Code, Cursor,
# Windsurf, VSCodium and the CLI package) is used. Add a `targets:` list to replace it,
# or list ids under `disabled_targets` to skip individual ones.
";

/// Renders the default configuration file.
pub fn default_config_yaml() -> Result<String> {
    let body = serde_yaml::to_string(&UpdaterConfig::default()).context("could not serialize the default configuration")?;
    Ok(format!("{HEADER}\n{body}"))
}

/// Entry point for `devbox-update generate`.
///
/// # Arguments
/// * `config_path`: Where to write the file; defaults to `~/.devbox-update/config.yaml`.
/// * `force`: Overwrite an existing file instead of leaving it alone.
pub fn run(config_path: Option<&str>, force: bool) -> Result<i32> {
    let path = resolve_config_path(config_path);
    log_debug!("[Generate] Target file: {}", path.display());
    write_default_config(&path, force)?;
    Ok(EXIT_OK)
}

/// Writes the default configuration to `path`. Returns whether the file was written.
fn write_default_config(path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        log_info!(
            "[Generate] Skipping existing file {}. Pass --force to overwrite it.",
            path.display().to_string().yellow()
        );
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("could not create {}", parent.display()))?;
    }
    fs::write(path, default_config_yaml()?).with_context(|| format!("could not write {}", path.display()))?;

    log_info!("[Generate] Wrote default configuration to {}", path.display().to_string().green());
    Ok(true)
}
