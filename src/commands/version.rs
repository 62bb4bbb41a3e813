// `devbox-update version`: print our own version.

use crate::libs::orchestrator::EXIT_OK;
use crate::schemas::registry_file::OBSERVED_SCHEMA;
use colored::Colorize;

pub fn run() -> i32 {
    println!("{} {}", env!("CARGO_PKG_NAME").bold(), env!("CARGO_PKG_VERSION").green());
    println!("profile registry layout: {}", OBSERVED_SCHEMA.dimmed());
    EXIT_OK
}
