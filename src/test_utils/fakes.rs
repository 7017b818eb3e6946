//! Fake capabilities for tests.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::process::{CapturedOutput, CommandRunner, CommandSpec, CommandStatus};

type Effect = Box<dyn Fn(&CommandSpec) + Send + Sync>;

/// A [`CommandRunner`] that records every invocation instead of spawning.
///
/// By default each command succeeds with empty output. Responses can be
/// scripted per subcommand (e.g. `clone` or `rank`), and an effect closure
/// can simulate what the command would have done on disk (e.g. populate
/// the clone directory).
pub struct FakeCommandRunner {
    calls: Mutex<Vec<CommandSpec>>,
    default: CapturedOutput,
    responses: HashMap<String, CapturedOutput>,
    failure: Option<String>,
    effect: Option<Effect>,
}

impl Default for FakeCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCommandRunner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            default: CapturedOutput {
                status: CommandStatus::from_code(0),
                stdout: String::new(),
                stderr: String::new(),
            },
            responses: HashMap::new(),
            failure: None,
            effect: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: CommandStatus) -> Self {
        self.default.status = status;
        self
    }

    #[must_use]
    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.default.stdout = stdout.into();
        self
    }

    #[must_use]
    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.default.stderr = stderr.into();
        self
    }

    /// Answer commands that have `subcommand` among their arguments.
    #[must_use]
    pub fn respond_to(mut self, subcommand: &str, status: i32, stdout: &str) -> Self {
        self.responses.insert(
            subcommand.to_string(),
            CapturedOutput {
                status: CommandStatus::from_code(status),
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        );
        self
    }

    /// Make every invocation fail as if the program could not be spawned.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Run `effect` for every invocation, before its response is returned.
    #[must_use]
    pub fn with_effect(mut self, effect: impl Fn(&CommandSpec) + Send + Sync + 'static) -> Self {
        self.effect = Some(Box::new(effect));
        self
    }

    /// Every command run so far, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn respond(&self, spec: &CommandSpec) -> Result<CapturedOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(spec.clone());
        }
        if let Some(message) = &self.failure {
            anyhow::bail!("Failed to execute {}: {message}", spec.display());
        }
        if let Some(effect) = &self.effect {
            effect(spec);
        }
        let output = spec
            .args
            .iter()
            .find_map(|arg| self.responses.get(arg))
            .unwrap_or(&self.default);
        Ok(output.clone())
    }
}

impl CommandRunner for FakeCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandStatus> {
        self.respond(spec).map(|output| output.status)
    }

    async fn run_captured(&self, spec: &CommandSpec) -> Result<CapturedOutput> {
        self.respond(spec)
    }
}
