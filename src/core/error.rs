//! Error handling for AutoCrew
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`AutocrewError`]) for the failures callers
//!    need to tell apart (network vs. malformed data, usage conflicts, missing
//!    artifacts, clone failures).
//! 2. **User-friendly messages** ([`ErrorContext`]) with details and an
//!    actionable suggestion for whatever reaches the top of the CLI.
//!
//! Internal plumbing propagates `anyhow::Result` with `.context(...)`;
//! [`user_friendly_error`] looks through the chain for a typed error and
//! falls back to printing the whole cause chain.
//!
//! # Examples
//!
//! ```rust,no_run
//! use autocrew::core::{AutocrewError, user_friendly_error};
//!
//! let err = anyhow::Error::from(AutocrewError::NoArtifactsFound {
//!     goal: "write a newsletter".to_string(),
//! });
//! user_friendly_error(err).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::constants::{ISSUES_URL, LOG_FILE};

/// Every failure class the AutoCrew core distinguishes.
#[derive(Error, Debug)]
pub enum AutocrewError {
    /// The release endpoint or another remote could not be reached.
    #[error("Network unavailable: {operation}")]
    NetworkUnavailable {
        /// What was being attempted.
        operation: String,
        /// Underlying transport error or HTTP status.
        reason: String,
    },

    /// The remote answered, but with data that could not be interpreted.
    #[error("Malformed remote data from {source_name}: {reason}")]
    MalformedRemoteData {
        /// Where the data came from.
        source_name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A file or directory could not be written.
    #[error("Cannot write to {path}: {operation}")]
    FilesystemUnwritable {
        /// The write that failed.
        operation: String,
        /// Target path.
        path: String,
    },

    /// Mutually exclusive command-line arguments were combined.
    #[error("{message}")]
    UsageConflict {
        /// Explanation shown to the user.
        message: String,
    },

    /// No generated scripts exist for the requested goal.
    #[error("No existing scripts found to rank for goal '{goal}'")]
    NoArtifactsFound {
        /// The overall goal the lookup was made for.
        goal: String,
    },

    /// Catch-all for failures inside the generation or ranking workflow.
    #[error("Workflow failed: {message}")]
    UnhandledWorkflowError {
        /// Description of the failure.
        message: String,
    },

    /// `git` could not be located on `PATH`.
    #[error("Git is not installed or not found in PATH")]
    GitNotFound,

    /// `git clone` exited unsuccessfully.
    #[error("Failed to clone repository: {url}")]
    GitCloneFailed {
        /// Repository URL.
        url: String,
        /// Exit status or stderr summary.
        reason: String,
    },

    /// A configuration file could not be parsed.
    #[error("Invalid configuration syntax in {file} (line {line})")]
    ConfigParseError {
        /// File name, or `<memory>` for in-memory input.
        file: String,
        /// One-based line number.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// Generation or ranking was requested without a configured backend.
    #[error("No crew backend configured")]
    BackendNotConfigured,

    /// The crew backend exited unsuccessfully.
    #[error("Crew backend '{command}' failed: {reason}")]
    BackendFailed {
        /// Backend command line.
        command: String,
        /// Exit status description.
        reason: String,
    },

    /// Raw I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Version string that does not follow semantic versioning.
    #[error("Semver parsing error: {0}")]
    Semver(#[from] semver::Error),
}

impl AutocrewError {
    /// Whether this error is a usage problem rather than a runtime failure.
    #[must_use]
    pub const fn is_usage(&self) -> bool {
        matches!(self, Self::UsageConflict { .. })
    }
}

/// An error together with optional details and a suggestion for the user.
#[derive(Debug)]
pub struct ErrorContext {
    /// Headline error.
    pub error: String,
    /// Longer explanation, often the cause chain.
    pub details: Option<String>,
    /// What the user can do about it.
    pub suggestion: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print to stderr with colours.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error reaching the top level into something printable.
///
/// Typed [`AutocrewError`]s anywhere in the chain get a tailored suggestion;
/// everything else is shown with its full cause chain and a pointer to the
/// log file.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let typed = error
        .downcast_ref::<AutocrewError>()
        .or_else(|| error.chain().find_map(|cause| cause.downcast_ref::<AutocrewError>()));
    if let Some(typed) = typed {
        return create_error_context(typed, &error);
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::PermissionDenied {
            return ErrorContext::new(error.to_string())
                .with_suggestion("Check that the installation directory is writable")
                .with_details("AutoCrew needs write access to its own directory for logs, backups and scripts");
        }
    }

    ErrorContext::new(error.to_string())
        .with_details(format_chain(&error).unwrap_or_else(|| "no further details".to_string()))
        .with_suggestion(format!(
            "See \"{LOG_FILE}\" for the full log. If the problem persists, open an issue at {ISSUES_URL} and attach it"
        ))
}

fn create_error_context(typed: &AutocrewError, error: &anyhow::Error) -> ErrorContext {
    let base = ErrorContext::new(error.to_string());
    let base = match format_chain(error) {
        Some(chain) => base.with_details(chain),
        None => base,
    };

    match typed {
        AutocrewError::NetworkUnavailable { .. } => {
            base.with_suggestion("Check your internet connection and try again")
        }
        AutocrewError::MalformedRemoteData { .. } => base.with_suggestion(
            "The release endpoint returned unexpected data; try again later or upgrade manually",
        ),
        AutocrewError::FilesystemUnwritable { .. } => {
            base.with_suggestion("Check permissions and free space in the installation directory")
        }
        AutocrewError::UsageConflict { .. } => {
            base.with_suggestion("Run with -h to see the available options")
        }
        AutocrewError::NoArtifactsFound { .. } => base.with_suggestion(
            "Generate scripts for this goal first, for example with -m 3, then rank them",
        ),
        AutocrewError::GitNotFound => {
            base.with_suggestion("Install git and make sure it is on your PATH")
        }
        AutocrewError::GitCloneFailed { .. } => base
            .with_suggestion("Check network access to the repository; the local installation was not modified"),
        AutocrewError::ConfigParseError { file, .. } => base.with_suggestion(format!(
            "Fix the syntax in {file}, or restore it from the .backup directory"
        )),
        AutocrewError::BackendNotConfigured => base.with_suggestion(
            "Set 'command' in the [CREW_BACKEND] section of config.ini",
        ),
        AutocrewError::BackendFailed { .. } | AutocrewError::UnhandledWorkflowError { .. } => base
            .with_suggestion(format!(
                "See \"{LOG_FILE}\" for details. If the problem persists, open an issue at {ISSUES_URL}"
            )),
        AutocrewError::Io(_) | AutocrewError::Semver(_) => base,
    }
}

fn format_chain(error: &anyhow::Error) -> Option<String> {
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if chain.is_empty() {
        return None;
    }

    let mut message = String::from("Caused by:");
    for (i, cause) in chain.iter().enumerate() {
        message.push_str(&format!("\n  {}: {}", i + 1, cause));
    }
    Some(message)
}
