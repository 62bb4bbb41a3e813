// `devbox-update update`: the full detect -> resolve -> select -> install -> verify run.

use crate::libs::context::RunContext;
use crate::libs::orchestrator::run_update;
use crate::libs::report::print_summary;
use crate::libs::selection::SelectionPolicy;
use crate::libs::system::{SystemCommandRunner, TerminalPrompter, ThreadSleeper, UreqHttpClient};
use crate::libs::target_registry::load_targets;
use crate::schemas::config::RunSettings;
use crate::{log_debug, log_info};
use anyhow::Result;
use colored::Colorize;
use std::io::IsTerminal;

/// Flags of the `update` subcommand.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateFlags {
    pub dry_run: bool,
    pub all_targets: bool,
    pub all_profiles: bool,
    pub force: bool,
    pub yes: bool,
}

impl UpdateFlags {
    /// Selection policy for these flags. Without a terminal on stdin nobody can answer a prompt.
    pub fn policy(&self, stdin_is_terminal: bool) -> SelectionPolicy {
        SelectionPolicy {
            all_targets: self.all_targets,
            all_profiles: self.all_profiles,
            force: self.force,
            non_interactive: self.yes || !stdin_is_terminal,
        }
    }
}

pub fn run(config_path: Option<&str>, flags: UpdateFlags) -> Result<i32> {
    log_debug!("Entered update::run() with {:?}", flags);
    if flags.dry_run {
        log_info!("{}", "Dry run: nothing will be downloaded, installed or written".yellow());
    }

    let config = super::load(config_path)?;
    let targets = load_targets(&config);

    let (runner, http, sleeper) = (SystemCommandRunner, UreqHttpClient::new(), ThreadSleeper);
    let prompter = TerminalPrompter::new();
    let ctx = RunContext::new(
        &config,
        RunSettings::from_config(&config, flags.dry_run),
        &runner,
        &http,
        &sleeper,
    );

    let policy = flags.policy(std::io::stdin().is_terminal());
    let summary = run_update(&targets, policy, &prompter, &ctx)?;
    print_summary(&summary);
    Ok(summary.exit_code())
}
