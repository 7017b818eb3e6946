//! Typed view of the `config.ini` keys the AutoCrew core reads.
//!
//! Everything else in `config.ini` belongs to the crew backend and is passed
//! through untouched (and preserved across upgrades by the merge step).
//!
//! ```ini
//! [MISCELLANEOUS]
//! on_screen_logging_level = INFO
//!
//! [UPGRADE]
//! releases_url = https://api.github.com/repos/yanniedog/autocrew/releases/latest
//! repository_url = https://github.com/yanniedog/autocrew.git
//!
//! [CREW_BACKEND]
//! command = python3 core.py
//! python = python3
//! ```
//!
//! `AUTOCREW_RELEASES_URL` and `AUTOCREW_REPOSITORY_URL` override the
//! `[UPGRADE]` values when set.

use anyhow::Result;
use std::path::Path;
use tracing::level_filters::LevelFilter;

use super::ini::ConfigDocument;
use crate::constants::{
    DEFAULT_PYTHON, DEFAULT_RELEASES_URL, DEFAULT_REPOSITORY_URL, RELEASES_URL_ENV,
    REPOSITORY_URL_ENV,
};

/// Settings the core needs, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Console verbosity when `--verbose` is not given.
    pub console_level: LevelFilter,
    /// Latest-release endpoint.
    pub releases_url: String,
    /// Repository cloned during an upgrade.
    pub repository_url: String,
    /// Crew backend command line, split on whitespace. Empty when unset.
    pub backend_command: Vec<String>,
    /// Interpreter used to auto-run generated scripts.
    pub python: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            console_level: LevelFilter::INFO,
            releases_url: DEFAULT_RELEASES_URL.to_string(),
            repository_url: DEFAULT_REPOSITORY_URL.to_string(),
            backend_command: Vec::new(),
            python: DEFAULT_PYTHON.to_string(),
        }
    }
}

impl Settings {
    /// Extract settings from a parsed document. Unknown or invalid values
    /// fall back to defaults.
    #[must_use]
    pub fn from_document(doc: &ConfigDocument) -> Self {
        let defaults = Self::default();

        let console_level = doc
            .get("MISCELLANEOUS", "on_screen_logging_level")
            .and_then(parse_level)
            .unwrap_or(defaults.console_level);

        let non_empty = |section: &str, key: &str| {
            doc.get(section, key).map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
        };

        Self {
            console_level,
            releases_url: non_empty("UPGRADE", "releases_url").unwrap_or(defaults.releases_url),
            repository_url: non_empty("UPGRADE", "repository_url")
                .unwrap_or(defaults.repository_url),
            backend_command: non_empty("CREW_BACKEND", "command")
                .map(|c| c.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            python: non_empty("CREW_BACKEND", "python").unwrap_or(defaults.python),
        }
    }

    /// Apply environment overrides on top of the file values.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = env_value(RELEASES_URL_ENV) {
            self.releases_url = url;
        }
        if let Some(url) = env_value(REPOSITORY_URL_ENV) {
            self.repository_url = url;
        }
        self
    }

    /// Load `config.ini` from `path` (missing file means defaults) and
    /// apply environment overrides.
    pub fn load(path: &Path) -> Result<(Self, ConfigDocument)> {
        let doc = ConfigDocument::load_or_empty(path)?;
        Ok((Self::from_document(&doc).with_env_overrides(), doc))
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Map the level names used in `config.ini` to a filter.
///
/// Accepts `DEBUG`, `INFO`, `WARNING`/`WARN`, `ERROR`, `CRITICAL` and
/// `TRACE`, case-insensitively.
#[must_use]
pub fn parse_level(value: &str) -> Option<LevelFilter> {
    match value.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Some(LevelFilter::TRACE),
        "DEBUG" => Some(LevelFilter::DEBUG),
        "INFO" => Some(LevelFilter::INFO),
        "WARNING" | "WARN" => Some(LevelFilter::WARN),
        "ERROR" | "CRITICAL" => Some(LevelFilter::ERROR),
        _ => None,
    }
}
