// Register application subcommands.
// Each module corresponds to a specific `devbox-update` command-line action and returns the
// process exit code.

// Detects targets and prints installed vs. latest versions.
pub mod check;
// Writes the default configuration file.
pub mod generate;
// Runs a full update.
pub mod update;
// Displays the version of devbox-update.
pub mod version;

use crate::libs::config_loading::load_config;
use crate::libs::paths::resolve_config_path;
use crate::schemas::config::UpdaterConfig;
use anyhow::{Context, Result};

/// Resolves and loads the configuration shared by `check` and `update`.
pub(crate) fn load(config_path: Option<&str>) -> Result<UpdaterConfig> {
    let path = resolve_config_path(config_path);
    load_config(&path).with_context(|| format!("could not load configuration from {}", path.display()))
}
