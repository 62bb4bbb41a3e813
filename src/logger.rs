// This file implements the application's logging system.
// It provides macros for different log levels (INFO, WARN, ERROR, DEBUG).
// Every macro formats its arguments eagerly and hands the message to `tracing`,
// so detection workers running on separate threads log through one subscriber.

use tracing::Level;

/// Provides convenient logging macros.
/// `#[macro_export]` makes these macros globally available within the crate.

// `log_info!` for general application progress and informational messages.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => (::tracing::info!("{}", format!($($arg)*)));
}

// `log_warn!` for non-critical issues or noteworthy conditions.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => (::tracing::warn!("{}", format!($($arg)*)));
}

// `log_error!` for critical errors requiring immediate attention.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => (::tracing::error!("{}", format!($($arg)*)));
}

// `log_debug!` for detailed internal tracing.
// Filtered out by the subscriber unless `--debug` was passed.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => (::tracing::debug!("{}", format!($($arg)*)));
}

/// Initializes the logger, installing a `tracing` subscriber that writes to stderr.
/// This function should be called once at application startup.
///
/// # Arguments
/// * `debug`: If `true`, enables debug logging; otherwise, only info, warn, and error messages are printed.
pub fn init(debug: bool) {
    let level = max_level(debug);

    // `try_init` tolerates a second initialization (e.g., from tests) instead of panicking.
    let installed = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();

    if installed {
        crate::log_debug!("Logger initialized in DEBUG mode");
    }
}

/// Maps the `--debug` flag onto the most verbose level the subscriber lets through.
fn max_level(debug: bool) -> Level {
    if debug { Level::DEBUG } else { Level::INFO }
}
