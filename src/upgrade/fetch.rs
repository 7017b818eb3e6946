//! Fetching the latest source tree for an upgrade.
//!
//! The whole repository is cloned with the system `git` into a side
//! directory of the installation root. Nothing in the live installation is
//! touched here.

use anyhow::Result;
use std::path::Path;
use tracing::{debug, info};

use crate::constants::GIT_CLONE_TIMEOUT;
use crate::core::AutocrewError;
use crate::process::{CommandRunner, CommandSpec};
use crate::utils::fs::remove_dir_all;

/// Clones the source repository through a [`CommandRunner`].
pub struct SourceFetcher<'a, R> {
    runner: &'a R,
    repository_url: String,
    git_program: Option<String>,
}

impl<'a, R: CommandRunner> SourceFetcher<'a, R> {
    pub fn new(runner: &'a R, repository_url: impl Into<String>) -> Self {
        Self {
            runner,
            repository_url: repository_url.into(),
            git_program: None,
        }
    }

    /// Use `program` instead of looking `git` up on `PATH`.
    #[must_use]
    pub fn with_git_program(mut self, program: impl Into<String>) -> Self {
        self.git_program = Some(program.into());
        self
    }

    #[must_use]

    fn git_program(&self) -> Result<String, AutocrewError> {
        if let Some(program) = &self.git_program {
            return Ok(program.clone());
        }
        which::which("git")
            .map(|path| path.display().to_string())
            .map_err(|_| AutocrewError::GitNotFound)
    }

    /// Clone into `destination`, first removing anything a previous
    /// interrupted run left there.
    pub async fn fetch(&self, destination: &Path) -> Result<()> {
        remove_dir_all(destination)?;

        let git = self.git_program()?;
        let spec = CommandSpec::new(git)
            .arg("clone")
            .arg(self.repository_url.as_str())
            .arg(destination.display().to_string())
            .with_timeout(GIT_CLONE_TIMEOUT);

        info!("Fetching the latest source from {}", self.repository_url);
        let output =
            self.runner.run_captured(&spec).await.map_err(|e| AutocrewError::GitCloneFailed {
                url: self.repository_url.clone(),
                reason: format!("{e:#}"),
            })?;

        if !output.status.success() {
            let stderr = output.stderr.trim();
            let reason = if stderr.is_empty() {
                output.status.describe()
            } else {
                format!("{}: {stderr}", output.status.describe())
            };
            return Err(AutocrewError::GitCloneFailed {
                url: self.repository_url.clone(),
                reason,
            }
            .into());
        }

        debug!("Cloned {} into {}", self.repository_url, destination.display());
        Ok(())
    }
}
