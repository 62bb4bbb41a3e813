//! # Error Taxonomy
//!
//! Errors are split by blast radius:
//!
//! - **Run-fatal**: `ResolutionFailure` and `DownloadFailure`. Both happen before anything on
//!   disk is touched, so aborting leaves the machine unchanged. `Config` errors are fatal too.
//! - **Scoped**: `DetectionFailure` (one target), `InstallFailure` (one unit),
//!   `FanoutFailure` (one profile), `VerificationFailure` (one unit). These are folded into the
//!   final report and never abort the run.
//!
//! Capability errors (`CommandError`, `HttpError`, `PromptError`) describe a single call to an
//! external collaborator and are wrapped by the variants above.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A single external command invocation went wrong.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("failed while waiting on '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A single HTTP request went wrong before a status code was received.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("interactive prompt failed: {0}")]
    Interaction(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Everything that can go wrong while orchestrating an update.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("detection of '{target}' failed: {reason}")]
    DetectionFailure { target: String, reason: String },

    #[error("could not resolve the latest version of '{package}' (primary: {primary}; fallback: {fallback})")]
    ResolutionFailure {
        package: String,
        primary: String,
        fallback: String,
    },

    #[error("download of {url} failed after {attempts} attempt(s): {reason}")]
    DownloadFailure {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("install on '{unit}' failed: {reason}")]
    InstallFailure { unit: String, reason: String },

    #[error("fanout into profile '{profile}' failed: {reason}")]
    FanoutFailure { profile: String, reason: String },

    #[error("'{unit}' still reports {observed} after {attempts} verification attempt(s), expected {expected}")]
    VerificationFailure {
        unit: String,
        expected: String,
        observed: String,
        attempts: u32,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fanout_failure_names_the_profile() {
        let fanout = UpdateError::FanoutFailure {
            profile: "work".into(),
            reason: "denied".into(),
        };

        assert_eq!(
            fanout.to_string(),
            "fanout into profile 'work' failed: denied"
        );
    }
}
