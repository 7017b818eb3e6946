//! AutoCrew - generate, rank and run CrewAI crews, with self-upgrade
//!
//! AutoCrew turns an overall goal into "crew" scripts (multi-agent task
//! pipelines), can generate several alternatives and have them ranked, and
//! keeps its own installation up to date by pulling a fresh copy of itself.
//!
//! # Architecture Overview
//!
//! Everything runs sequentially from the installation directory, which holds
//! the program files plus:
//!
//! - `config.ini` - settings shared with the crew backend
//! - `autocrew.log` - log of the last run (truncated on start)
//! - `.backup/` - log and config snapshots taken before each upgrade
//! - `scripts/` - generated crews (`<stem>.csv` + `<stem>.py`)
//!
//! Crew generation and ranking are delegated to an external backend through
//! [`crew::CrewBackend`]. The self-upgrade workflow is the part AutoCrew
//! implements itself:
//!
//! ```text
//! version check -> fetch -> backup -> merge config -> replace files -> cleanup
//! ```
//!
//! # Core Modules
//!
//! ## Workflows
//! - [`cli`] - Argument handling and dispatch
//! - [`upgrade`] - Version check and the upgrade state machine
//! - [`crew`] - Backend interface, script discovery and auto-run
//!
//! ## Supporting Modules
//! - [`config`] - `config.ini` parsing and typed settings
//! - [`core`] - Error types and user-facing error display
//! - [`logging`] - File and console logging
//! - [`process`] - Subprocess execution
//! - [`utils`] - Filesystem helpers
//! - [`constants`] - File names, URLs and timeouts
//!
//! # Command-Line Usage
//!
//! ```bash
//! autocrew "write a weekly newsletter"          # generate one crew
//! autocrew -m 3 -a "write a weekly newsletter"  # generate three and run them
//! autocrew -r "write a weekly newsletter"       # rank existing crews
//! autocrew -u                                   # upgrade
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod crew;
pub mod logging;
pub mod process;
pub mod upgrade;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
