//! Test utilities for AutoCrew
//!
//! Helpers shared by unit tests and the integration suite (behind the
//! `test-utils` feature): one-time logging setup and fake implementations
//! of the capabilities the core injects.
//!
//! # Example
//!
//! ```rust,no_run
//! use autocrew::process::{CommandRunner, CommandSpec};
//! use autocrew::test_utils::FakeCommandRunner;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let runner = FakeCommandRunner::new().with_stdout("scripts/plan.csv\n");
//! runner.run_captured(&CommandSpec::new("crew").arg("generate")).await?;
//! assert_eq!(runner.calls().len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod fakes;

pub use fakes::FakeCommandRunner;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, tests run without a subscriber.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
