// Resolves where `devbox-update` keeps its configuration.

use crate::libs::utilities::path_helpers::{expand_path, get_devbox_dir};
use crate::log_debug;
use colored::Colorize;
use std::path::PathBuf;

/// File name of the configuration inside `~/.devbox-update`.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// The default configuration file, `~/.devbox-update/config.yaml`.
pub fn default_config_path() -> PathBuf {
    get_devbox_dir().join(CONFIG_FILE_NAME)
}

/// Resolves the configuration file path.
///
/// # Arguments
/// * `config_path`: A user-supplied path (`--config` or `DEVBOX_UPDATE_CONFIG`); `~` and
///   environment variables are expanded.
///
/// # Returns
/// The user's path when given, otherwise [`default_config_path`].
pub fn resolve_config_path(config_path: Option<&str>) -> PathBuf {
    let resolved = config_path.map(expand_path).unwrap_or_else(default_config_path);
    log_debug!("Using configuration file: {}", resolved.display().to_string().cyan());
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        assert_eq!(resolve_config_path(Some("/etc/dbu.yaml")), PathBuf::from("/etc/dbu.yaml"));
    }

    #[test]
    fn default_lives_in_devbox_dir() {
        let path = resolve_config_path(None);
        assert!(path.ends_with(".devbox-update/config.yaml"));
    }
}
