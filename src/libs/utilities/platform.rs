// Our custom logging macros to give us nicely formatted (and colored!) output
// for debugging, general information, and errors.
use crate::{log_debug, log_warn};
// The 'colored' crate helps us make our console output look pretty and readable.
use colored::Colorize;

/// Detects the current operating system as a canonical lowercase string
/// ("macos", "linux", "windows").
///
/// `std::env::consts::OS` is the OS this binary was compiled for, which is always the
/// OS it is running on.
pub fn detect_os() -> String {
    normalize_os(std::env::consts::OS)
}

/// Detects the current CPU architecture as a canonical string ("arm64", "x86_64").
pub fn detect_architecture() -> String {
    normalize_arch(std::env::consts::ARCH)
}

/// Normalizes the many spellings of an operating system name into one of
/// "macos", "linux" or "windows". Unknown values are returned lowercased.
///
/// # Arguments
/// * `os`: An input string (`&str`) representing an OS (e.g., "macOS", "darwin", "Linux").
pub fn normalize_os(os: &str) -> String {
    match os.to_lowercase().as_str() {
        "macos" | "darwin" | "apple-darwin" => "macos".to_string(),
        "linux" => "linux".to_string(),
        "windows" | "win32" | "win64" => "windows".to_string(),
        other => {
            log_warn!(
                "[Utils] Unknown OS variant '{}', using as-is. Marketplace platform matching may fall back to 'universal'.",
                other.purple()
            );
            other.to_string()
        }
    }
}

/// Normalizes CPU architecture names ("aarch64" and "arm64" become "arm64", "amd64" and
/// "x86_64" become "x86_64"). Unknown values are returned lowercased.
pub fn normalize_arch(arch: &str) -> String {
    match arch.to_lowercase().as_str() {
        "aarch64" | "arm64" => "arm64".to_string(),
        "amd64" | "x86_64" => "x86_64".to_string(),
        other => {
            log_warn!("[Utils] Unknown ARCH variant '{}', using as-is.", other.purple());
            other.to_string()
        }
    }
}

/// Maps a normalized (os, arch) pair onto the identifier the extension marketplace uses for
/// platform-specific packages, e.g. `darwin-arm64`, `linux-x64` or `win32-x64`.
///
/// Unknown combinations map to `universal`, which every platform-neutral extension accepts.
pub fn marketplace_platform(os: &str, arch: &str) -> String {
    let os_part = match os {
        "macos" => "darwin",
        "linux" => "linux",
        "windows" => "win32",
        _ => return "universal".to_string(),
    };
    let arch_part = match arch {
        "arm64" => "arm64",
        "x86_64" => "x64",
        _ => return "universal".to_string(),
    };

    let platform = format!("{os_part}-{arch_part}");
    log_debug!("[Utils] Marketplace platform resolved to {}", platform.cyan());
    platform
}

/// The marketplace platform identifier of the machine we are running on.
pub fn current_marketplace_platform() -> String {
    marketplace_platform(&detect_os(), &detect_architecture())
}
