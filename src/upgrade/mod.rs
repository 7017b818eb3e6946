//! Self-upgrade for AutoCrew.
//!
//! AutoCrew upgrades itself by pulling a fresh copy of its source tree and
//! laying it over the installation directory, keeping the user's settings.
//!
//! # Update Process Flow
//!
//! ```text
//! 1. Version Check
//!    └── Fetch the latest release descriptor and compare with our version
//!
//! 2. Fetch
//!    └── git clone the repository into autocrew_update/
//!
//! 3. Backup (failure is logged, not fatal)
//!    ├── Copy autocrew.log and config.ini into .backup/ with a timestamp
//!    └── Refresh .backup/config_backup.ini
//!
//! 4. Merge
//!    └── New default config.ini + current config.ini, user values win
//!
//! 5. Replace
//!    ├── Copy every fetched file (except .git/ and config.ini) over the installation
//!    └── Write the merged config.ini
//!
//! 6. Cleanup
//!    └── Remove autocrew_update/
//! ```
//!
//! There is no rollback: a failure while replacing files leaves a mixed
//! installation, recoverable from `.backup/` or by re-running the upgrade.
//!
//! # Module Structure
//!
//! - [`version_check`]: release lookup and version comparison
//! - [`fetch`]: cloning the source tree
//! - [`backup`]: snapshots of the log and config
//! - [`merge`]: configuration reconciliation
//! - [`installer`]: file replacement in the installation root
//! - [`coordinator`]: the state machine tying the steps together
//!
//! # Example
//!
//! ```rust,no_run
//! use autocrew::process::SystemCommandRunner;
//! use autocrew::upgrade::{FsInstaller, SourceFetcher, UpgradeCoordinator, VersionChecker};
//! use autocrew::config::Settings;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = Settings::default();
//! let checker = VersionChecker::from_settings(&settings)?;
//! let status = checker.check().await;
//!
//! let runner = SystemCommandRunner;
//! let fetcher = SourceFetcher::new(&runner, settings.repository_url.as_str());
//! let coordinator =
//!     UpgradeCoordinator::new(fetcher, FsInstaller::new("."), checker.current_version().clone());
//! let outcome = coordinator.run(&status).await;
//! std::process::exit(i32::from(outcome.exit_code()));
//! # }
//! ```

pub mod backup;
pub mod coordinator;
pub mod fetch;
pub mod installer;
pub mod merge;
pub mod version_check;

pub use coordinator::{UpgradeCoordinator, UpgradeOutcome, UpgradeSession, UpgradeState};
pub use fetch::SourceFetcher;
pub use installer::{FsInstaller, Installer};
pub use version_check::{VersionChecker, VersionStatus};
