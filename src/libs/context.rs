// The per-run context threaded through detection, resolution, install and verification.
// Nothing in the engine keeps "current instance" state on a long-lived object; every step
// receives what it needs through this value.

use crate::libs::system::{CommandRunner, HttpClient, Sleeper};
use crate::schemas::config::{RunSettings, UpdaterConfig};

/// Borrowed capabilities plus the settings of the current run.
///
/// `RunContext` is `Sync`, so detection workers share one instance by reference.
pub struct RunContext<'a> {
    pub config: &'a UpdaterConfig,
    pub settings: RunSettings,
    pub runner: &'a dyn CommandRunner,
    pub http: &'a dyn HttpClient,
    pub sleeper: &'a dyn Sleeper,
}

impl<'a> RunContext<'a> {
    pub fn new(
        config: &'a UpdaterConfig,
        settings: RunSettings,
        runner: &'a dyn CommandRunner,
        http: &'a dyn HttpClient,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        RunContext {
            config,
            settings,
            runner,
            http,
            sleeper,
        }
    }
}
