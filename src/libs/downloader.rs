//! # Artifact Downloader
//!
//! Fetches the installable package for one desired version, retrying with linear backoff.
//! The result is an [`Artifact`] guard: the file is deleted when the guard drops, on every
//! exit path, unless the run explicitly retains it after a failed verification.

use crate::libs::context::RunContext;
use crate::libs::errors::UpdateError;
use crate::schemas::config::ExtensionSpec;
use crate::schemas::versions::VersionInfo;
use crate::{log_debug, log_info, log_warn};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

const ARTIFACT_ACCEPT: &str = "application/octet-stream";

/// A downloaded package file, removed on drop unless retained.
#[derive(Debug)]
pub struct Artifact {
    path: PathBuf,
    attempts: u32,
    retained: bool,
}

impl Artifact {
    pub fn new(path: PathBuf, attempts: u32) -> Self {
        Artifact {
            path,
            attempts,
            retained: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Download attempts it took to obtain the file.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Keeps the file on disk past the end of the run and returns its path.
    pub fn retain(mut self) -> PathBuf {
        self.retained = true;
        self.path.clone()
    }
}

impl Drop for Artifact {
    fn drop(&mut self) {
        if self.retained {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => log_debug!("[DBU::Downloader] Removed artifact {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log_warn!(
                "[DBU::Downloader] Could not remove artifact {}: {}",
                self.path.display().to_string().yellow(),
                e
            ),
        }
    }
}

/// Fills the marketplace download template for `extension` at `version`.
pub fn artifact_url(template: &str, extension: &ExtensionSpec, version: &VersionInfo, platform: &str) -> String {
    template
        .replace("{publisher}", &extension.publisher)
        .replace("{name}", &extension.name)
        .replace("{version}", &version.raw)
        .replace("{platform}", platform)
}

/// File name of the artifact for `identifier` at `version`.
pub fn artifact_file_name(identifier: &str, version: &VersionInfo) -> String {
    format!("{identifier}-{}.vsix", version.raw)
}

/// Downloads `url` to `destination`.
///
/// Every attempt needs a 2xx status and a non-empty body. After failed attempt `n` the
/// downloader waits `n * download_backoff`. Exhausting every attempt is run-fatal.
pub fn download_artifact(url: &str, destination: &Path, ctx: &RunContext) -> Result<Artifact, UpdateError> {
    let attempts = ctx.settings.download_attempts;
    let mut last_reason = String::from("no attempt made");

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| UpdateError::DownloadFailure {
            url: url.to_string(),
            attempts: 0,
            reason: format!("cannot create {}: {e}", parent.display()),
        })?;
    }

    for attempt in 1..=attempts {
        log_info!(
            "[DBU::Downloader] Downloading {} (attempt {}/{})",
            url.cyan(),
            attempt,
            attempts
        );

        match fetch_once(url, destination, ctx) {
            Ok(bytes) => {
                log_info!(
                    "[DBU::Downloader] Saved {} bytes to {}",
                    bytes,
                    destination.display().to_string().green()
                );
                return Ok(Artifact::new(destination.to_path_buf(), attempt));
            }
            Err(reason) => {
                log_warn!("[DBU::Downloader] Attempt {} failed: {}", attempt, reason);
                last_reason = reason;
            }
        }

        if attempt < attempts {
            ctx.sleeper.sleep(ctx.settings.download_backoff * attempt);
        }
    }

    Err(UpdateError::DownloadFailure {
        url: url.to_string(),
        attempts,
        reason: last_reason,
    })
}

fn fetch_once(url: &str, destination: &Path, ctx: &RunContext) -> Result<usize, String> {
    let response = ctx
        .http
        .get(url, ARTIFACT_ACCEPT, ctx.settings.http_timeout)
        .map_err(|e| e.to_string())?;
    if !response.is_success() {
        return Err(format!("HTTP {}", response.status));
    }
    if response.body.is_empty() {
        return Err("empty response body".to_string());
    }
    fs::write(destination, &response.body).map_err(|e| format!("cannot write {}: {e}", destination.display()))?;
    Ok(response.body.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::test_support::*;
    use crate::schemas::config::UpdaterConfig;
    use crate::schemas::versions::Provenance;
    use std::time::Duration;
    use tempfile::tempdir;

    const URL: &str = "https://gallery.test/vspackage";

    #[test]
    fn url_template_is_fully_substituted() {
        let config = UpdaterConfig::default();
        let url = artifact_url(
            &config.marketplace.download_url,
            &config.extension,
            &VersionInfo::new("11.0.0", Provenance::Primary),
            "linux-x64",
        );
        assert_eq!(
            url,
            "https://marketplace.visualstudio.com/_apis/public/gallery/publishers/esbenp/vsextensions/prettier-vscode/11.0.0/vspackage?targetPlatform=linux-x64"
        );
    }

    #[test]
    fn retries_with_linear_backoff_until_success() {
        let config = UpdaterConfig::default();
        let runner = FakeRunner::missing();
        let http = FakeHttp::new()
            .respond(URL, 500, "")
            .respond(URL, 500, "")
            .respond(URL, 200, "PK\u{3}\u{4}vsix");
        let sleeper = RecordingSleeper::default();
        let ctx = context(&config, &runner, &http, &sleeper);
        let temp = tempdir().unwrap();

        let artifact = download_artifact(URL, &temp.path().join("downloads/a.vsix"), &ctx).unwrap();

        assert_eq!(artifact.attempts(), 3);
        assert!(artifact.path().is_file());
        let base = ctx.settings.download_backoff;
        assert_eq!(sleeper.count(), 2);
        assert_eq!(sleeper.total(), base + base * 2);
        assert_eq!(sleeper.total(), Duration::from_millis(300));
    }

    #[test]
    fn empty_bodies_exhaust_attempts() {
        let config = UpdaterConfig::default();
        let runner = FakeRunner::missing();
        let http = FakeHttp::new().respond(URL, 200, "").respond(URL, 200, "").respond(URL, 200, "");
        let sleeper = RecordingSleeper::default();
        let ctx = context(&config, &runner, &http, &sleeper);
        let temp = tempdir().unwrap();

        let err = download_artifact(URL, &temp.path().join("a.vsix"), &ctx).unwrap_err();

        assert!(matches!(err, UpdateError::DownloadFailure { attempts: 3, ref reason, .. } if reason == "empty response body"));
        assert!(!temp.path().join("a.vsix").exists());
    }

    #[test]
    fn guard_deletes_file_unless_retained() {
        let temp = tempdir().unwrap();
        let dropped = temp.path().join("dropped.vsix");
        let kept = temp.path().join("kept.vsix");
        fs::write(&dropped, "x").unwrap();
        fs::write(&kept, "x").unwrap();

        drop(Artifact::new(dropped.clone(), 1));
        let retained = Artifact::new(kept.clone(), 1).retain();

        assert!(!dropped.exists());
        assert_eq!(retained, kept);
        assert!(kept.exists());
    }
}
