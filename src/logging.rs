//! Logging setup.
//!
//! Two `tracing-subscriber` layers share one registry:
//!
//! - a file layer writing `autocrew.log` at `DEBUG`, with timestamps,
//!   levels and source locations; the file is truncated on every run
//! - a console layer printing bare messages to stdout at the console level
//!
//! `RUST_LOG`, when set, replaces the console filter.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Everything at `DEBUG`, minus HTTP client internals.
const FILE_FILTER: &str = "debug,hyper=info,hyper_util=info,reqwest=info,h2=info,rustls=info";

/// Handle to the initialized logging stack.
///
/// Built once near the start of the program; call [`Logger::shutdown`]
/// before exiting so the log file is on disk.
pub struct Logger {
    file: Arc<File>,
    path: PathBuf,
}

impl Logger {
    /// Install the global subscriber.
    ///
    /// `verbose` forces `DEBUG` on the console; otherwise `console_level`
    /// applies.
    pub fn init(verbose: bool, console_level: LevelFilter, log_path: &Path) -> Result<Self> {
        let console_level = if verbose {
            LevelFilter::DEBUG
        } else {
            console_level
        };

        let file = File::create(log_path)
            .with_context(|| format!("Failed to create log file {}", log_path.display()))?;
        let file = Arc::new(file);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file.clone())
            .with_ansi(false)
            .with_target(false)
            .with_file(true)
            .with_line_number(true)
            .with_filter(EnvFilter::new(FILE_FILTER));

        let console_filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(console_level.to_string())
        };
        let console_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .without_time()
            .with_level(false)
            .with_target(false)
            .with_filter(console_filter);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(console_layer)
            .try_init()
            .context("Failed to initialize logging")?;

        Ok(Self {
            file,
            path: log_path.to_path_buf(),
        })
    }

    /// Sync the log file to disk.
    pub fn shutdown(self) -> Result<()> {
        self.file
            .sync_all()
            .with_context(|| format!("Failed to flush log file {}", self.path.display()))
    }
}
