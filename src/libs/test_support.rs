//! Test doubles for the external capabilities plus fixture builders.

use crate::libs::context::RunContext;
use crate::libs::errors::{CommandError, HttpError, PromptError};
use crate::libs::system::{CommandOutput, CommandRunner, HttpClient, HttpResponse, Prompter, Sleeper};
use crate::schemas::config::{RunSettings, UpdaterConfig};
use crate::schemas::targets::{
    CommandTemplate, CommandTemplates, DetectionStrategy, InstallTarget, ProfileLayout, TargetKind,
};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

type Handler = Box<dyn Fn(&str, &[String]) -> Result<CommandOutput, CommandError> + Send + Sync>;

/// A `CommandRunner` answering from a closure and recording every invocation as `program arg...`.
pub struct FakeRunner {
    handler: Handler,
    calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new(handler: impl Fn(&str, &[String]) -> Result<CommandOutput, CommandError> + Send + Sync + 'static) -> Self {
        FakeRunner {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every program is missing from PATH.
    pub fn missing() -> Self {
        FakeRunner::new(|program, _| {
            Err(CommandError::Spawn {
                program: program.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            })
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &str, args: &[String], _timeout: Duration) -> Result<CommandOutput, CommandError> {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(line);
        (self.handler)(program, args)
    }
}

pub fn ok_output(stdout: &str) -> Result<CommandOutput, CommandError> {
    Ok(CommandOutput {
        status: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    })
}

pub fn failed_output(code: i32, stderr: &str) -> Result<CommandOutput, CommandError> {
    Ok(CommandOutput {
        status: Some(code),
        stdout: String::new(),
        stderr: stderr.to_string(),
    })
}

/// An `HttpClient` serving scripted responses per URL, in order. Unknown URLs fail.
#[derive(Default)]
pub struct FakeHttp {
    routes: Mutex<HashMap<String, VecDeque<Result<HttpResponse, HttpError>>>>,
    requests: Mutex<Vec<String>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, url: &str, status: u16, body: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(Ok(HttpResponse {
                status,
                body: body.as_bytes().to_vec(),
            }));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, method: &str, url: &str) -> Result<HttpResponse, HttpError> {
        self.requests.lock().unwrap().push(format!("{method} {url}"));
        self.routes
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| {
                Err(HttpError::Transport {
                    url: url.to_string(),
                    message: "no scripted response".to_string(),
                })
            })
    }
}

impl HttpClient for FakeHttp {
    fn get(&self, url: &str, _accept: &str, _timeout: Duration) -> Result<HttpResponse, HttpError> {
        self.next("GET", url)
    }

    fn post_json(
        &self,
        url: &str,
        _accept: &str,
        _body: &serde_json::Value,
        _timeout: Duration,
    ) -> Result<HttpResponse, HttpError> {
        self.next("POST", url)
    }
}

/// A `Sleeper` that only records requested delays.
#[derive(Default)]
pub struct RecordingSleeper {
    pub delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn total(&self) -> Duration {
        self.delays.lock().unwrap().iter().sum()
    }

    pub fn count(&self) -> usize {
        self.delays.lock().unwrap().len()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// A `Prompter` returning canned selections, one per call.
pub struct ScriptedPrompter {
    pub selections: Mutex<VecDeque<Vec<usize>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(selections: Vec<Vec<usize>>) -> Self {
        ScriptedPrompter {
            selections: Mutex::new(selections.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn multi_select(&self, prompt: &str, items: &[String], _defaults: &[bool]) -> Result<Vec<usize>, PromptError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self
            .selections
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| (0..items.len()).collect()))
    }
}

/// Settings with small, easy-to-sum delays. `RecordingSleeper` never actually waits.
pub fn fast_settings(config: &UpdaterConfig) -> RunSettings {
    let mut settings = RunSettings::from_config(config, false);
    settings.download_backoff = Duration::from_millis(100);
    settings.verify_delay = Duration::from_millis(10);
    settings
}

pub fn context<'a>(
    config: &'a UpdaterConfig,
    runner: &'a FakeRunner,
    http: &'a FakeHttp,
    sleeper: &'a RecordingSleeper,
) -> RunContext<'a> {
    RunContext::new(config, fast_settings(config), runner, http, sleeper)
}

/// An extension-host target whose package store and profiles live under `root`.
pub fn editor_target(root: &Path) -> InstallTarget {
    let storage = root.join("extensions");
    InstallTarget {
        id: "testcode".to_string(),
        display_name: "Test Code".to_string(),
        kind: TargetKind::ExtensionHost,
        priority: 10,
        profile_aware: true,
        cli: "testcode".to_string(),
        detection: vec![
            DetectionStrategy::CommandProbe,
            DetectionStrategy::FilesystemMarker {
                path: storage.to_string_lossy().to_string(),
            },
        ],
        commands: CommandTemplates {
            version: CommandTemplate::new(&["{cli}", "--version"]),
            list: CommandTemplate::new(&["{cli}", "--list-extensions", "--show-versions"]),
            install: CommandTemplate::new(&["{cli}", "--install-extension", "{artifact}", "--force"]),
        },
        storage_dir: Some(storage.to_string_lossy().to_string()),
        profiles: Some(ProfileLayout {
            root: root.join("profiles").to_string_lossy().to_string(),
            storage: "extensions".to_string(),
            registry: "extensions.json".to_string(),
        }),
        list_pattern: "(?im)^{id}@(\\S+)$".to_string(),
        list_shows_versions: true,
    }
}

/// A CLI-package target with no package store.
pub fn cli_target() -> InstallTarget {
    InstallTarget {
        id: "prettier-cli".to_string(),
        display_name: "prettier CLI".to_string(),
        kind: TargetKind::CliPackage,
        priority: 50,
        profile_aware: false,
        cli: "prettier".to_string(),
        detection: vec![DetectionStrategy::CommandProbe],
        commands: CommandTemplates {
            version: CommandTemplate::new(&["{cli}", "--version"]),
            list: CommandTemplate::new(&["npm", "ls", "-g", "{package}", "--depth=0"]),
            install: CommandTemplate::new(&["npm", "install", "-g", "{package}@{version}"]),
        },
        storage_dir: None,
        profiles: None,
        list_pattern: r"(?m)(?:^|[\s─┬└├│])@?{id}@(\S+)".to_string(),
        list_shows_versions: true,
    }
}

/// Creates `<storage>/<name>/package.json` so the directory looks like an unpacked extension.
pub fn make_package_dir(storage: &Path, name: &str) {
    let dir = storage.join(name);
    fs::create_dir_all(dir.join("dist")).unwrap();
    fs::write(dir.join("package.json"), format!(r#"{{"name":"{name}"}}"#)).unwrap();
    fs::write(dir.join("dist").join("extension.js"), "module.exports = {};").unwrap();
}
