//! Crew generation and ranking backends.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::ScriptArtifact;
use crate::config::Settings;
use crate::core::AutocrewError;
use crate::process::{CapturedOutput, CommandRunner, CommandSpec};

/// Result of ranking a set of crews.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingReport {
    /// Summary produced by the judge, shown to the user as-is.
    pub summary: String,
    /// How many crews were ranked.
    pub ranked: usize,
}

/// Narrow interface to whatever generates and ranks crews.
#[allow(async_fn_in_trait)]
pub trait CrewBackend {
    /// Generate `count` alternative crews for `goal`.
    async fn generate(&self, goal: &str, count: u32, verbose: bool)
    -> Result<Vec<ScriptArtifact>>;

    /// Rank `artifacts` against `goal`.
    async fn rank(
        &self,
        goal: &str,
        artifacts: &[ScriptArtifact],
        verbose: bool,
    ) -> Result<RankingReport>;
}

/// [`CrewBackend`] implemented by an external program.
///
/// The program is configured as `[CREW_BACKEND] command` and is invoked
/// from the installation root as:
///
/// ```text
/// <command> generate --goal <goal> --count <n> [--verbose]
/// <command> rank --goal <goal> [--verbose] <csv>...
/// ```
///
/// `generate` prints one CSV path per line; `rank` prints its summary.
pub struct CommandBackend<'a, R> {
    runner: &'a R,
    command: Vec<String>,
    root: PathBuf,
}

impl<'a, R: CommandRunner> CommandBackend<'a, R> {
    /// Fails with [`AutocrewError::BackendNotConfigured`] when `command` is empty.
    pub fn new(
        runner: &'a R,
        command: Vec<String>,
        root: impl Into<PathBuf>,
    ) -> Result<Self, AutocrewError> {
        if command.is_empty() {
            return Err(AutocrewError::BackendNotConfigured);
        }
        Ok(Self {
            runner,
            command,
            root: root.into(),
        })
    }

    pub fn from_settings(
        runner: &'a R,
        settings: &Settings,
        root: impl Into<PathBuf>,
    ) -> Result<Self, AutocrewError> {
        Self::new(runner, settings.backend_command.clone(), root)
    }

    fn spec(&self, subcommand: &str) -> CommandSpec {
        // `new` rejects an empty command
        let (program, args) = match self.command.split_first() {
            Some((program, args)) => (program.as_str(), args),
            None => ("", &[][..]),
        };
        CommandSpec::new(program)
            .args(args.iter().cloned())
            .arg(subcommand)
            .current_dir(&self.root)
    }

    async fn call(&self, spec: CommandSpec) -> Result<CapturedOutput> {
        let output = self.runner.run_captured(&spec).await.map_err(|e| {
            AutocrewError::BackendFailed {
                command: spec.display(),
                reason: format!("{e:#}"),
            }
        })?;

        if !output.status.success() {
            let stderr = output.stderr.trim();
            let reason = if stderr.is_empty() {
                output.status.describe()
            } else {
                format!("{}: {stderr}", output.status.describe())
            };
            return Err(AutocrewError::BackendFailed {
                command: spec.display(),
                reason,
            }
            .into());
        }
        Ok(output)
    }

    fn resolve(&self, reported: &str) -> PathBuf {
        let path = Path::new(reported);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl<R: CommandRunner> CrewBackend for CommandBackend<'_, R> {
    async fn generate(
        &self,
        goal: &str,
        count: u32,
        verbose: bool,
    ) -> Result<Vec<ScriptArtifact>> {
        let mut spec =
            self.spec("generate").args(["--goal", goal, "--count"]).arg(count.to_string());
        if verbose {
            spec = spec.arg("--verbose");
        }

        let output = self.call(spec).await?;
        let artifacts: Vec<ScriptArtifact> = output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| ScriptArtifact::new(self.resolve(line)))
            .collect();

        if artifacts.is_empty() {
            return Err(AutocrewError::UnhandledWorkflowError {
                message: "the crew backend reported no generated scripts".to_string(),
            }
            .into());
        }
        for artifact in &artifacts {
            info!("Generated {}", artifact.csv_path().display());
        }
        Ok(artifacts)
    }

    async fn rank(
        &self,
        goal: &str,
        artifacts: &[ScriptArtifact],
        verbose: bool,
    ) -> Result<RankingReport> {
        let mut spec = self.spec("rank").args(["--goal", goal]);
        if verbose {
            spec = spec.arg("--verbose");
        }
        spec = spec.args(artifacts.iter().map(|a| a.csv_path().display().to_string()));

        let output = self.call(spec).await?;
        debug!("Ranking output:\n{}", output.stdout);
        Ok(RankingReport {
            summary: output.stdout.trim().to_string(),
            ranked: artifacts.len(),
        })
    }
}
