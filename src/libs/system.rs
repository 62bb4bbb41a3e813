//! # External Capabilities
//!
//! The narrow seams through which the engine talks to the outside world:
//!
//! - [`CommandRunner`]: run a process with a timeout and capture its output
//! - [`HttpClient`]: GET / POST-JSON with a timeout
//! - [`Sleeper`]: wait between retry attempts
//! - [`Prompter`]: let an operator pick from a list
//!
//! Production implementations live here; tests swap in fakes so detection, install and
//! verification can run without editors, npm or the network.

use crate::libs::errors::{CommandError, HttpError, PromptError};
use dialoguer::theme::ColorfulTheme;
use dialoguer::MultiSelect;
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// Identifies us to the marketplace and npm.
const USER_AGENT: &str = concat!("devbox-update/", env!("CARGO_PKG_VERSION"));

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// A short, single-line reason suitable for an outcome table.
    pub fn failure_summary(&self) -> String {
        let stderr = self.stderr.trim();
        let first_line = stderr.lines().next().unwrap_or("");
        match (self.status, first_line.is_empty()) {
            (Some(code), true) => format!("exit code {code}"),
            (Some(code), false) => format!("exit code {code}: {first_line}"),
            (None, _) => "terminated by signal".to_string(),
        }
    }
}

pub trait CommandRunner: Send + Sync {
    /// Runs `program args...`, killing it once `timeout` elapses.
    fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<CommandOutput, CommandError>;
}

/// Runs real processes via `std::process::Command`.
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<CommandOutput, CommandError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: program.to_string(),
                source,
            })?;
        let deadline = Instant::now() + timeout;
        let timed_out = || CommandError::Timeout {
            program: program.to_string(),
            timeout,
        };

        // Drain both pipes on their own threads so a chatty child cannot block on a full pipe.
        let (sender, receiver) = mpsc::channel();
        if let Some(stdout) = child.stdout.take() {
            spawn_reader(Pipe::Stdout, stdout, sender.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(Pipe::Stderr, stderr, sender.clone());
        }
        drop(sender);

        let status = match child.wait_timeout(timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(timed_out());
            }
            Err(source) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CommandError::Wait {
                    program: program.to_string(),
                    source,
                });
            }
        };

        let mut output = CommandOutput {
            status: status.code(),
            ..Default::default()
        };

        // A background helper that inherited the pipes keeps them open after the child exits.
        // The same deadline bounds how long we wait for them to close.
        loop {
            match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok((Pipe::Stdout, text)) => output.stdout = text,
                Ok((Pipe::Stderr, text)) => output.stderr = text,
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    let _ = child.kill();
                    return Err(timed_out());
                }
            }
        }

        Ok(output)
    }
}

#[derive(Debug, Clone, Copy)]
enum Pipe {
    Stdout,
    Stderr,
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Pipe, mut reader: R, sender: Sender<(Pipe, String)>) {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = reader.read_to_end(&mut buffer);
        let _ = sender.send((pipe, String::from_utf8_lossy(&buffer).to_string()));
    });
}

/// An HTTP response, whatever its status.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

pub trait HttpClient: Send + Sync {
    /// Non-2xx statuses are returned as responses, not errors.
    fn get(&self, url: &str, accept: &str, timeout: Duration) -> Result<HttpResponse, HttpError>;

    fn post_json(
        &self,
        url: &str,
        accept: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<HttpResponse, HttpError>;
}

/// Blocking HTTP client backed by a shared `ureq` agent.
pub struct UreqHttpClient {
    agent: ureq::Agent,
}

impl UreqHttpClient {
    pub fn new() -> Self {
        UreqHttpClient {
            agent: ureq::AgentBuilder::new().user_agent(USER_AGENT).build(),
        }
    }
}

impl Default for UreqHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for UreqHttpClient {
    fn get(&self, url: &str, accept: &str, timeout: Duration) -> Result<HttpResponse, HttpError> {
        let request = self.agent.get(url).set("Accept", accept).timeout(timeout);
        into_http_response(url, request.call())
    }

    fn post_json(
        &self,
        url: &str,
        accept: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<HttpResponse, HttpError> {
        let request = self.agent.post(url).set("Accept", accept).timeout(timeout);
        into_http_response(url, request.send_json(body))
    }
}

/// `ureq` reports non-2xx statuses as `Error::Status`; fold those back into a response.
fn into_http_response(
    url: &str,
    result: Result<ureq::Response, ureq::Error>,
) -> Result<HttpResponse, HttpError> {
    let response = match result {
        Ok(response) => response,
        Err(ureq::Error::Status(_, response)) => response,
        Err(ureq::Error::Transport(transport)) => {
            return Err(HttpError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            });
        }
    };

    let status = response.status();
    let mut body = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut body)
        .map_err(|source| HttpError::Body {
            url: url.to_string(),
            source,
        })?;

    Ok(HttpResponse { status, body })
}

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

pub trait Prompter {
    /// Returns the indices of the chosen items.
    fn multi_select(&self, prompt: &str, items: &[String], defaults: &[bool]) -> Result<Vec<usize>, PromptError>;
}

/// Interactive terminal prompts via `dialoguer`.
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        TerminalPrompter {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn multi_select(&self, prompt: &str, items: &[String], defaults: &[bool]) -> Result<Vec<usize>, PromptError> {
        MultiSelect::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .defaults(defaults)
            .interact()
            .map_err(|e| PromptError::Interaction(e.to_string()))
    }
}
