// Entry point for `devbox-update`: parse the command line, initialize logging, dispatch,
// and turn the outcome into a process exit code.

mod cli;
mod commands;
mod installers;
mod libs;
mod logger;
mod schemas;

use clap::Parser;
use cli::cmd_enums::{Cli, Commands};
use colored::Colorize;
use commands::update::UpdateFlags;
use libs::orchestrator::EXIT_FATAL;

fn main() {
    let cli = Cli::parse();
    logger::init(cli.debug);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Check => commands::check::run(config),
        Commands::Update {
            dry_run,
            all_targets,
            all_profiles,
            force,
            yes,
        } => commands::update::run(
            config,
            UpdateFlags {
                dry_run,
                all_targets,
                all_profiles,
                force,
                yes,
            },
        ),
        Commands::Generate { force } => commands::generate::run(config, force),
        Commands::Version => Ok(commands::version::run()),
    };

    let code = match result {
        Ok(code) => code,
        Err(err) => {
            log_error!("{} {:#}", "Aborted:".red().bold(), err);
            EXIT_FATAL
        }
    };
    std::process::exit(code);
}
