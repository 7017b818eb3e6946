//! Subprocess execution behind a substitutable capability.
//!
//! Everything AutoCrew runs as a child process (the `git clone` during an
//! upgrade, the crew backend, auto-run of generated scripts) goes through a
//! [`CommandRunner`]. The binary uses [`SystemCommandRunner`]; tests supply a
//! fake that records invocations and simulates their effects.
//!
//! Every call waits for the child to exit before returning.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Exit status of a finished child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl CommandStatus {
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        Self {
            code: Some(code),
        }
    }

    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Human-readable description for logs and error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

impl From<std::process::ExitStatus> for CommandStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Output of a command whose stdout was captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub status: CommandStatus,
    pub stdout: String,
    pub stderr: String,
}

/// A program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub const fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// `program arg1 arg2 ...` for logging.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Capability to run external programs.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run with inherited stdio and return the exit status.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandStatus>;

    /// Run with stdout and stderr captured.
    async fn run_captured(&self, spec: &CommandSpec) -> Result<CapturedOutput>;
}

/// [`CommandRunner`] backed by real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    fn build(spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(dir) = &spec.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl CommandRunner for SystemCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandStatus> {
        tracing::debug!(target: "process", "Executing command: {}", spec.display());

        let mut cmd = Self::build(spec);
        cmd.stdin(Stdio::inherit()).stdout(Stdio::inherit()).stderr(Stdio::inherit());
        let mut child =
            cmd.spawn().with_context(|| format!("Failed to execute {}", spec.display()))?;

        let status = match spec.timeout {
            Some(duration) => {
                let waited = timeout(duration, child.wait()).await;
                match waited {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!(
                            target: "process",
                            "Command timed out after {} seconds: {}",
                            duration.as_secs(),
                            spec.display()
                        );
                        let _ = child.kill().await;
                        anyhow::bail!(
                            "Command timed out after {} seconds: {}",
                            duration.as_secs(),
                            spec.display()
                        );
                    }
                }
            }
            None => child.wait().await,
        }
        .with_context(|| format!("Failed to wait for {}", spec.display()))?;

        let status = CommandStatus::from(status);
        tracing::debug!(target: "process", "{} finished with {}", spec.program, status.describe());
        Ok(status)
    }

    async fn run_captured(&self, spec: &CommandSpec) -> Result<CapturedOutput> {
        tracing::debug!(target: "process", "Executing command (captured): {}", spec.display());

        let mut cmd = Self::build(spec);
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        let output_future = cmd.output();

        let output = match spec.timeout {
            Some(duration) => timeout(duration, output_future).await.map_err(|_| {
                anyhow::anyhow!(
                    "Command timed out after {} seconds: {}",
                    duration.as_secs(),
                    spec.display()
                )
            })?,
            None => output_future.await,
        }
        .with_context(|| format!("Failed to execute {}", spec.display()))?;

        let captured = CapturedOutput {
            status: output.status.into(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !captured.stderr.trim().is_empty() {
            tracing::debug!(target: "process", "({}) stderr: {}", spec.program, captured.stderr.trim());
        }
        tracing::debug!(
            target: "process",
            "{} finished with {}",
            spec.program,
            captured.status.describe()
        );
        Ok(captured)
    }
}
