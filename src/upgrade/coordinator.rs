//! The upgrade workflow as an explicit state machine.
//!
//! ```text
//! Idle -> Fetching -> BackingUp -> Merging -> Replacing -> CleaningUp -> Done
//!   \
//!    -> Aborted (no newer version)        any non-terminal state -> Failed
//! ```
//!
//! There is no rollback. A failure during `Fetching` or `Merging` leaves
//! the live installation untouched; a failure during `Replacing` leaves it
//! partially upgraded, and the backups in `.backup/` are the way back.

use anyhow::{Context, Result};
use semver::Version;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::backup::{Backup, BackupManager};
use super::fetch::SourceFetcher;
use super::installer::Installer;
use super::merge::merge_with_report;
use super::version_check::{VersionComparison, VersionStatus, compare};
use crate::config::ConfigDocument;
use crate::constants::{BACKUP_DIR, CONFIG_BACKUP_FILE, CONFIG_FILE, LOG_FILE, UPDATE_DIR};
use crate::core::AutocrewError;
use crate::process::CommandRunner;
use crate::utils::fs::{remove_dir_all, tree_files};

/// Shown when an upgrade is requested but nothing newer can be installed.
pub const NO_UPDATE_MESSAGE: &str =
    "No new version available or you are already running the latest version.";

/// Directories in the fetched tree that are never copied into the installation.
const SKIPPED_DIRS: &[&str] = &[".git"];

/// Where an upgrade session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeState {
    Idle,
    Fetching,
    BackingUp,
    Merging,
    Replacing,
    CleaningUp,
    Done,
    Aborted,
    Failed,
}

impl UpgradeState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted | Self::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use UpgradeState::{
            Aborted, BackingUp, CleaningUp, Done, Failed, Fetching, Idle, Merging, Replacing,
        };

        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Idle, Fetching | Aborted)
                | (Fetching, BackingUp)
                | (BackingUp, Merging)
                | (Merging, Replacing)
                | (Replacing, CleaningUp)
                | (CleaningUp, Done)
                | (_, Failed)
        )
    }
}

impl fmt::Display for UpgradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::BackingUp => "backing up",
            Self::Merging => "merging",
            Self::Replacing => "replacing",
            Self::CleaningUp => "cleaning up",
            Self::Done => "done",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State of one upgrade invocation.
#[derive(Debug, Clone)]
pub struct UpgradeSession {
    working_dir: PathBuf,
    current: Version,
    target: Option<Version>,
    state: UpgradeState,
    history: Vec<UpgradeState>,
}

impl UpgradeSession {
    #[must_use]
    pub fn new(working_dir: PathBuf, current: Version) -> Self {
        Self {
            working_dir,
            current,
            target: None,
            state: UpgradeState::Idle,
            history: vec![UpgradeState::Idle],
        }
    }

    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    #[must_use]
    pub const fn current(&self) -> &Version {
        &self.current
    }

    #[must_use]
    pub const fn target(&self) -> Option<&Version> {
        self.target.as_ref()
    }

    #[must_use]
    pub const fn state(&self) -> UpgradeState {
        self.state
    }

    /// Every state visited, starting with `Idle`.
    #[must_use]
    pub fn history(&self) -> &[UpgradeState] {
        &self.history
    }

    /// Move to `next`, rejecting transitions the state machine does not allow.
    pub fn advance(&mut self, next: UpgradeState) -> Result<(), AutocrewError> {
        if !self.state.can_transition_to(next) {
            return Err(AutocrewError::UnhandledWorkflowError {
                message: format!("invalid upgrade transition from {} to {next}", self.state),
            });
        }
        debug!("Upgrade state: {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
        Ok(())
    }
}

/// How an upgrade invocation ended.
#[derive(Debug)]
pub enum UpgradeOutcome {
    /// The installation now runs `to`.
    Done {
        from: Version,
        to: Version,
        /// `None` when the backup step failed (which is not fatal).
        backup: Option<Backup>,
    },
    /// Nothing was done.
    Aborted { reason: String },
    /// The workflow stopped in `state`.
    Failed {
        state: UpgradeState,
        error: anyhow::Error,
    },
}

impl UpgradeOutcome {
    /// Process exit code for this outcome.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Done { .. } | Self::Aborted { .. } => 0,
            Self::Failed { .. } => 1,
        }
    }

    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

/// Runs fetch, backup, merge, replace and cleanup in order.
///
/// Steps run strictly one after another; each must finish before the next
/// begins. There is no automatic retry.
pub struct UpgradeCoordinator<'a, R, I> {
    fetcher: SourceFetcher<'a, R>,
    installer: I,
    current: Version,
}

impl<'a, R: CommandRunner, I: Installer> UpgradeCoordinator<'a, R, I> {
    pub fn new(fetcher: SourceFetcher<'a, R>, installer: I, current: Version) -> Self {
        Self {
            fetcher,
            installer,
            current,
        }
    }

    /// Upgrade if `status` reports a newer version.
    pub async fn run(&self, status: &VersionStatus) -> UpgradeOutcome {
        self.run_session(status).await.1
    }

    /// Like [`run`](Self::run), also returning the finished session.
    pub async fn run_session(&self, status: &VersionStatus) -> (UpgradeSession, UpgradeOutcome) {
        let working_dir = self.installer.root().join(UPDATE_DIR);
        let mut session = UpgradeSession::new(working_dir, self.current.clone());

        let target = match status.newer_version() {
            Some(remote) if compare(&self.current, remote) == VersionComparison::Newer => {
                remote.clone()
            }
            _ => {
                if let VersionStatus::Unknown(reason) = status {
                    debug!("Upgrade skipped, version check failed: {reason}");
                }
                let outcome = match session.advance(UpgradeState::Aborted) {
                    Ok(()) => UpgradeOutcome::Aborted {
                        reason: NO_UPDATE_MESSAGE.to_string(),
                    },
                    Err(e) => UpgradeOutcome::Failed {
                        state: UpgradeState::Idle,
                        error: e.into(),
                    },
                };
                return (session, outcome);
            }
        };
        session.target = Some(target.clone());

        info!("Upgrading AutoCrew from version {} to version {}", self.current, target);
        let outcome = match self.execute(&mut session, &target).await {
            Ok(backup) => {
                info!(
                    "Upgrade successful. AutoCrew has been updated from version {} to version {}.",
                    self.current, target
                );
                UpgradeOutcome::Done {
                    from: self.current.clone(),
                    to: target,
                    backup,
                }
            }
            Err(error) => {
                let failed_in = session.state();
                // Failed is reachable from every non-terminal state
                let _ = session.advance(UpgradeState::Failed);
                if let Err(e) = remove_dir_all(session.working_dir()) {
                    warn!("Could not remove {}: {e:#}", session.working_dir().display());
                }
                UpgradeOutcome::Failed {
                    state: failed_in,
                    error,
                }
            }
        };
        (session, outcome)
    }

    async fn execute(
        &self,
        session: &mut UpgradeSession,
        target: &Version,
    ) -> Result<Option<Backup>> {
        session.advance(UpgradeState::Fetching)?;
        self.fetcher.fetch(session.working_dir()).await?;

        session.advance(UpgradeState::BackingUp)?;
        let backup = match self.backup(target).await {
            Ok(backup) => Some(backup),
            Err(e) => {
                warn!("Backup failed, continuing without it: {e:#}");
                None
            }
        };

        session.advance(UpgradeState::Merging)?;
        let merged = self.merge(session.working_dir())?;

        session.advance(UpgradeState::Replacing)?;
        self.replace(session.working_dir(), &merged)?;

        session.advance(UpgradeState::CleaningUp)?;
        if let Err(e) = remove_dir_all(session.working_dir()) {
            warn!("Could not remove {}: {e:#}", session.working_dir().display());
        }

        session.advance(UpgradeState::Done)?;
        Ok(backup)
    }

    async fn backup(&self, target: &Version) -> Result<Backup> {
        let manager = BackupManager::new(self.installer.root().join(BACKUP_DIR))
            .with_label(format!("v{}-to-v{}", self.current, target));
        let config_path = self.installer.config_path();

        let log_path = self.installer.root().join(LOG_FILE);

        let backup = manager.snapshot(&[log_path, config_path.clone()]).await?;
        manager.preserve_as(&config_path, CONFIG_BACKUP_FILE).await?;
        debug!(
            "Snapshot of {} file(s) taken at {}",
            backup.entries().len(),
            backup.created_at().to_rfc3339()
        );
        Ok(backup)
    }

    fn merge(&self, working_dir: &Path) -> Result<ConfigDocument> {
        let fetched = ConfigDocument::load_or_empty(&working_dir.join(CONFIG_FILE))
            .context("Failed to load the default configuration of the new version")?;
        let current = self
            .installer
            .read_config()
            .context("Failed to load the current configuration")?;

        let (merged, report) = merge_with_report(&fetched, &current);
        for key in &report.overridden {
            debug!("Keeping user value for {key}");
        }
        for key in &report.stale {
            warn!("Keeping {key}, which the new version no longer defines");
        }
        Ok(merged)
    }

    fn replace(&self, working_dir: &Path, merged: &ConfigDocument) -> Result<()> {
        let files = tree_files(working_dir, SKIPPED_DIRS)?;
        let config = Path::new(CONFIG_FILE);

        for relative in files.iter().filter(|f| f.as_path() != config) {
            self.installer
                .install_file(relative, &working_dir.join(relative))
                .with_context(|| format!("Failed to install {}", relative.display()))?;
        }
        self.installer.write_config(merged)?;
        info!("Replaced {} file(s) and merged {}", files.len(), CONFIG_FILE);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CommandStatus;
    use crate::test_utils::FakeCommandRunner;
    use crate::upgrade::installer::FsInstaller;
    use tempfile::TempDir;

    const USER_CONFIG: &str = "[MISCELLANEOUS]\non_screen_logging_level = DEBUG\n\n\
                               [MODEL]\napi_key = sk-user\nlegacy = keep-me\n";
    const DEFAULT_CONFIG: &str = "[MISCELLANEOUS]\non_screen_logging_level = INFO\n\
                                  new_option = enabled\n\n[MODEL]\napi_key =\n";

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn live_install() -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.ini"), USER_CONFIG).unwrap();
        std::fs::write(temp.path().join("autocrew.log"), "previous run\n").unwrap();
        std::fs::write(temp.path().join("core.py"), "VERSION = '2.1.4'\n").unwrap();
        temp
    }

    /// Simulates `git clone <url> <dest>` by writing a release tree.
    fn cloning_runner(default_config: &'static str) -> FakeCommandRunner {
        FakeCommandRunner::new().with_effect(move |spec| {
            let dest = PathBuf::from(spec.args.last().unwrap());
            std::fs::create_dir_all(dest.join(".git")).unwrap();
            std::fs::create_dir_all(dest.join("lib")).unwrap();
            std::fs::write(dest.join(".git").join("HEAD"), "ref: refs/heads/main").unwrap();
            std::fs::write(dest.join("config.ini"), default_config).unwrap();
            std::fs::write(dest.join("core.py"), "VERSION = '2.2.0'\n").unwrap();
            std::fs::write(dest.join("lib").join("agents.py"), "AGENTS = []\n").unwrap();
        })
    }

    fn coordinator<'a>(
        runner: &'a FakeCommandRunner,
        root: &Path,
    ) -> UpgradeCoordinator<'a, FakeCommandRunner, FsInstaller> {
        let fetcher =
            SourceFetcher::new(runner, "https://example.com/autocrew.git").with_git_program("git");
        UpgradeCoordinator::new(fetcher, FsInstaller::new(root), v("2.1.4"))
    }

    #[test]
    fn test_state_transitions() {
        use UpgradeState::*;
        assert!(Idle.can_transition_to(Fetching));
        assert!(Idle.can_transition_to(Aborted));
        assert!(!Idle.can_transition_to(Merging));
        assert!(Replacing.can_transition_to(Failed));
        assert!(!Done.can_transition_to(Failed));
        assert!(!Aborted.can_transition_to(Fetching));
        assert!(!Fetching.can_transition_to(Aborted));

        let mut session = UpgradeSession::new(PathBuf::from("work"), v("2.1.4"));
        assert!(session.advance(Merging).is_err());
        session.advance(Fetching).unwrap();
        assert_eq!(session.history(), &[Idle, Fetching]);
    }

    #[tokio::test]
    async fn test_full_upgrade_merges_configuration() {
        crate::test_utils::init_test_logging(None);
        let live = live_install();
        let runner = cloning_runner(DEFAULT_CONFIG);
        let coordinator = coordinator(&runner, live.path());

        let (session, outcome) =
            coordinator.run_session(&VersionStatus::UpdateAvailable(v("2.2.0"))).await;

        assert_eq!(outcome.exit_code(), 0);
        match &outcome {
            UpgradeOutcome::Done { from, to, backup } => {
                assert_eq!(from, &v("2.1.4"));
                assert_eq!(to, &v("2.2.0"));
                assert_eq!(backup.as_ref().unwrap().entries().len(), 2);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        use UpgradeState::*;
        assert_eq!(
            session.history(),
            &[Idle, Fetching, BackingUp, Merging, Replacing, CleaningUp, Done]
        );

        let config = ConfigDocument::load(&live.path().join("config.ini")).unwrap();
        assert_eq!(config.get("MISCELLANEOUS", "on_screen_logging_level"), Some("DEBUG"));
        assert_eq!(config.get("MISCELLANEOUS", "new_option"), Some("enabled"));
        assert_eq!(config.get("MODEL", "api_key"), Some("sk-user"));
        assert_eq!(config.get("MODEL", "legacy"), Some("keep-me"));

        let core = std::fs::read_to_string(live.path().join("core.py")).unwrap();
        assert_eq!(core, "VERSION = '2.2.0'\n");
        assert!(live.path().join("lib").join("agents.py").exists());
        assert!(!live.path().join(".git").exists());
        assert!(!live.path().join(UPDATE_DIR).exists());

        let preserved = live.path().join(".backup").join("config_backup.ini");
        assert_eq!(std::fs::read_to_string(preserved).unwrap(), USER_CONFIG);
    }

    #[tokio::test]
    async fn test_replace_failure_leaves_partial_upgrade() {
        let live = TempDir::new().unwrap();
        std::fs::write(live.path().join("config.ini"), "[A]\nx = 1\n").unwrap();
        std::fs::write(live.path().join("a.py"), "old a").unwrap();
        // a directory where the new release has a file
        std::fs::create_dir_all(live.path().join("b.py")).unwrap();
        std::fs::write(live.path().join("b.py").join("keep"), "").unwrap();

        let runner = FakeCommandRunner::new().with_effect(|spec| {
            let dest = PathBuf::from(spec.args.last().unwrap());
            std::fs::create_dir_all(&dest).unwrap();
            std::fs::write(dest.join("a.py"), "new a").unwrap();
            std::fs::write(dest.join("b.py"), "new b").unwrap();
            std::fs::write(dest.join("config.ini"), "[A]\nx = 0\ny = 2\n").unwrap();
        });
        let coordinator = coordinator(&runner, live.path());

        let (session, outcome) =
            coordinator.run_session(&VersionStatus::UpdateAvailable(v("2.2.0"))).await;

        assert_eq!(outcome.exit_code(), 1);
        assert!(
            matches!(outcome, UpgradeOutcome::Failed { state: UpgradeState::Replacing, .. }),
            "unexpected outcome: {outcome:?}"
        );
        assert_eq!(session.state(), UpgradeState::Failed);
        // files installed before the failure stay upgraded
        assert_eq!(std::fs::read_to_string(live.path().join("a.py")).unwrap(), "new a");
        assert!(live.path().join("b.py").is_dir());
        // the merged config is only written after every file is in place
        assert_eq!(
            std::fs::read_to_string(live.path().join("config.ini")).unwrap(),
            "[A]\nx = 1\n"
        );
        assert!(!live.path().join(UPDATE_DIR).exists());
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_installation_untouched() {
        crate::test_utils::init_test_logging(None);
        let live = live_install();
        let before = std::fs::read(live.path().join("config.ini")).unwrap();
        let runner = FakeCommandRunner::new()
            .with_status(CommandStatus::from_code(128))
            .with_stderr("fatal: could not resolve host");
        let coordinator = coordinator(&runner, live.path());

        let (session, outcome) =
            coordinator.run_session(&VersionStatus::UpdateAvailable(v("2.2.0"))).await;

        assert_eq!(outcome.exit_code(), 1);
        match &outcome {
            UpgradeOutcome::Failed { state, error } => {
                assert_eq!(*state, UpgradeState::Fetching);
                assert!(matches!(
                    error.downcast_ref::<AutocrewError>(),
                    Some(AutocrewError::GitCloneFailed { .. })
                ));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(session.state(), UpgradeState::Failed);
        assert_eq!(std::fs::read(live.path().join("config.ini")).unwrap(), before);
        assert!(!live.path().join(".backup").exists());
        assert!(!live.path().join(UPDATE_DIR).exists());
    }

    #[tokio::test]
    async fn test_same_version_aborts_without_fetching() {
        let live = live_install();
        let runner = cloning_runner(DEFAULT_CONFIG);
        let coordinator = coordinator(&runner, live.path());

        for status in [
            VersionStatus::UpToDate,
            VersionStatus::Unknown("network unavailable".to_string()),
            VersionStatus::UpdateAvailable(v("2.1.4")),
            VersionStatus::UpdateAvailable(v("2.0.0")),
        ] {
            let (session, outcome) = coordinator.run_session(&status).await;
            assert_eq!(outcome.exit_code(), 0);
            assert!(
                matches!(&outcome, UpgradeOutcome::Aborted { reason } if reason == NO_UPDATE_MESSAGE)
            );
            assert_eq!(session.history(), &[UpgradeState::Idle, UpgradeState::Aborted]);
        }
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_backup_failure_is_not_fatal() {
        let live = live_install();
        // a file where the backup directory should go
        std::fs::write(live.path().join(".backup"), "blocked").unwrap();
        let runner = cloning_runner(DEFAULT_CONFIG);
        let coordinator = coordinator(&runner, live.path());

        let outcome = coordinator.run(&VersionStatus::UpdateAvailable(v("2.2.0"))).await;

        assert!(matches!(outcome, UpgradeOutcome::Done { backup: None, .. }));
        let config = ConfigDocument::load(&live.path().join("config.ini")).unwrap();
        assert_eq!(config.get("MISCELLANEOUS", "new_option"), Some("enabled"));
    }

    #[tokio::test]
    async fn test_malformed_fetched_config_fails_before_replacing() {
        let live = live_install();
        let runner = cloning_runner("this line has no section\n");
        let coordinator = coordinator(&runner, live.path());

        let outcome = coordinator.run(&VersionStatus::UpdateAvailable(v("2.2.0"))).await;

        assert!(matches!(outcome, UpgradeOutcome::Failed { state: UpgradeState::Merging, .. }));
        assert_eq!(
            std::fs::read_to_string(live.path().join("config.ini")).unwrap(),
            USER_CONFIG
        );
        assert_eq!(
            std::fs::read_to_string(live.path().join("core.py")).unwrap(),
            "VERSION = '2.1.4'\n"
        );
        assert!(!live.path().join(UPDATE_DIR).exists());
    }

    #[tokio::test]
    async fn test_missing_configs_are_treated_as_empty() {
        let live = TempDir::new().unwrap();
        let runner = FakeCommandRunner::new().with_effect(|spec| {
            let dest = PathBuf::from(spec.args.last().unwrap());
            std::fs::create_dir_all(&dest).unwrap();
            std::fs::write(dest.join("core.py"), "new").unwrap();
        });
        let coordinator = coordinator(&runner, live.path());

        let outcome = coordinator.run(&VersionStatus::UpdateAvailable(v("3.0.0"))).await;

        assert!(outcome.is_done());
        assert_eq!(std::fs::read_to_string(live.path().join("core.py")).unwrap(), "new");
        assert!(live.path().join("config.ini").exists());
    }
}
