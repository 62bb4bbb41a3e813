// Our custom logging macros to give us nicely formatted (and colored!) output
// for debugging, general information, and errors.
use crate::{log_debug, log_warn};
// The 'colored' crate helps us make our console output look pretty and readable.
use colored::Colorize;
// `std::path::PathBuf` provides an OS-agnostic way to build and manipulate file paths.
use std::path::PathBuf;

/// Name of the directory under `$HOME` holding our config and downloads.
const DEVBOX_DIR_NAME: &str = ".devbox-update";

/// Expands a leading `~` and any `$VAR` / `${VAR}` references in a configured path.
///
/// Every path that comes from `config.yaml` or the built-in host table goes through here,
/// so users can write `~/.cursor/extensions` or `$XDG_CONFIG_HOME/Code/User`.
///
/// # Arguments
/// * `path`: The raw path string.
///
/// # Returns
/// * `PathBuf`: The expanded path. If an environment variable is undefined, only the tilde
///   is expanded and the rest is kept verbatim.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            log_warn!(
                "[Utils] Could not expand variables in '{}': {}. Expanding '~' only.",
                path.yellow(),
                e
            );
            PathBuf::from(shellexpand::tilde(path).as_ref())
        }
    }
}

/// Returns the canonical path to the tool's home directory, `~/.devbox-update`.
///
/// Falls back to the current directory when the home directory cannot be determined,
/// which only happens in stripped-down containers.
pub fn get_devbox_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => {
            let dir = home.join(DEVBOX_DIR_NAME);
            log_debug!("[Utils] DevBox directory resolved to: {}", dir.display().to_string().cyan());
            dir
        }
        None => {
            let fallback = std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(DEVBOX_DIR_NAME);
            log_warn!(
                "[Utils] Could not determine home directory. Using {}",
                fallback.display().to_string().yellow()
            );
            fallback
        }
    }
}
