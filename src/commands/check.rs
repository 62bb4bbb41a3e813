// `devbox-update check`: detect and resolve, print a status table, change nothing.

use crate::libs::context::RunContext;
use crate::libs::orchestrator::{EXIT_OK, run_check};
use crate::libs::report::print_check;
use crate::libs::system::{SystemCommandRunner, ThreadSleeper, UreqHttpClient};
use crate::libs::target_registry::load_targets;
use crate::log_debug;
use crate::schemas::config::RunSettings;
use anyhow::Result;

pub fn run(config_path: Option<&str>) -> Result<i32> {
    log_debug!("Entered check::run()");
    let config = super::load(config_path)?;
    let targets = load_targets(&config);

    let (runner, http, sleeper) = (SystemCommandRunner, UreqHttpClient::new(), ThreadSleeper);
    let ctx = RunContext::new(
        &config,
        RunSettings::from_config(&config, false),
        &runner,
        &http,
        &sleeper,
    );

    let report = run_check(&targets, &ctx)?;
    print_check(&report);
    Ok(EXIT_OK)
}
