//! Global constants used throughout the AutoCrew codebase.
//!
//! File names of the installation layout, remote endpoints, and timeouts
//! shared by several modules are defined here so the layout is described
//! in one place.

use std::time::Duration;

/// Version of the running program, compared against published releases.
pub const AUTOCREW_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Latest-release descriptor endpoint consulted by the version check.
pub const DEFAULT_RELEASES_URL: &str =
    "https://api.github.com/repos/yanniedog/autocrew/releases/latest";

/// Source repository cloned in full during an upgrade.
pub const DEFAULT_REPOSITORY_URL: &str = "https://github.com/yanniedog/autocrew.git";

/// Where users are asked to report problems (with the log file attached).
pub const ISSUES_URL: &str = "https://github.com/yanniedog/autocrew/issues/new";

/// Environment variable overriding the release endpoint.
pub const RELEASES_URL_ENV: &str = "AUTOCREW_RELEASES_URL";

/// Environment variable overriding the source repository URL.
pub const REPOSITORY_URL_ENV: &str = "AUTOCREW_REPOSITORY_URL";

/// Structured key-value configuration in the installation root.
pub const CONFIG_FILE: &str = "config.ini";

/// Log file in the installation root, truncated on every run.
pub const LOG_FILE: &str = "autocrew.log";

/// Directory holding upgrade snapshots.
pub const BACKUP_DIR: &str = ".backup";

/// Fixed-name copy of the pre-upgrade configuration inside [`BACKUP_DIR`].
pub const CONFIG_BACKUP_FILE: &str = "config_backup.ini";

/// Side directory the latest source tree is cloned into during an upgrade.
pub const UPDATE_DIR: &str = "autocrew_update";

/// Directory generated crew artifacts are written to.
pub const SCRIPTS_DIR: &str = "scripts";

/// Timeout for the release endpoint request (10 seconds).
pub const RELEASE_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the full `git clone` of the source repository (5 minutes).
pub const GIT_CLONE_TIMEOUT: Duration = Duration::from_secs(300);

/// Default interpreter used to auto-run generated scripts.
pub const DEFAULT_PYTHON: &str = "python3";
