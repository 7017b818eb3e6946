//! Common test utilities for AutoCrew integration tests
//!
//! Every test gets its own installation directory and runs the real binary
//! from it. Remote endpoints point at a closed local port so the version
//! check fails fast and nothing leaves the machine.

// Allow dead code because not every test file uses every helper
#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Release endpoint nobody listens on.
pub const UNREACHABLE_RELEASES_URL: &str = "http://127.0.0.1:9/";

/// Repository URL nobody serves.
pub const UNREACHABLE_REPOSITORY_URL: &str = "http://127.0.0.1:9/none.git";

/// Minimal configuration naming a crew backend.
pub const BACKEND_CONFIG: &str = "\
[MISCELLANEOUS]
on_screen_logging_level = INFO

[CREW_BACKEND]
command = crew-backend-that-does-not-exist
";

/// A throwaway installation directory.
pub struct TestInstall {
    _temp_dir: TempDir, // Keep alive for RAII cleanup
    root: PathBuf,
}

impl TestInstall {
    /// Create an empty installation.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    /// Create an installation with `config.ini` set to `content`.
    pub fn with_config(content: &str) -> Self {
        let install = Self::new();
        install.write_config(content);
        install
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn write_config(&self, content: &str) {
        fs::write(self.path("config.ini"), content).expect("Failed to write config.ini");
    }

    pub fn read_config(&self) -> String {
        fs::read_to_string(self.path("config.ini")).expect("Failed to read config.ini")
    }

    pub fn write_file(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(path, content).expect("Failed to write file");
    }

    /// The autocrew binary, run from this installation.
    pub fn autocrew(&self) -> Command {
        let mut cmd = Command::cargo_bin("autocrew").expect("autocrew binary not built");
        cmd.current_dir(&self.root)
            .env("AUTOCREW_RELEASES_URL", UNREACHABLE_RELEASES_URL)
            .env("AUTOCREW_REPOSITORY_URL", UNREACHABLE_REPOSITORY_URL)
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }
}

impl Default for TestInstall {
    fn default() -> Self {
        Self::new()
    }
}
