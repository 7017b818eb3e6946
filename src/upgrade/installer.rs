use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::ConfigDocument;
use crate::constants::CONFIG_FILE;
use crate::core::AutocrewError;
use crate::utils::fs::{atomic_write, ensure_parent_dir};

/// Narrow write access to the installation root.
///
/// The coordinator performs every destructive step of an upgrade through
/// this trait, so tests can point it at a scratch directory.
pub trait Installer {
    /// The installation root.
    fn root(&self) -> &Path;

    /// Path of the live configuration file.
    fn config_path(&self) -> PathBuf {
        self.root().join(CONFIG_FILE)
    }

    /// Load the live configuration; a missing file reads as empty.
    fn read_config(&self) -> Result<ConfigDocument> {
        ConfigDocument::load_or_empty(&self.config_path())
    }

    /// Overwrite or create `relative` under the root with the contents of
    /// `source`.
    fn install_file(&self, relative: &Path, source: &Path) -> Result<()>;

    /// Replace the live configuration with `doc`.
    fn write_config(&self, doc: &ConfigDocument) -> Result<()>;
}

/// [`Installer`] writing directly to a directory on disk.
#[derive(Debug, Clone)]
pub struct FsInstaller {
    root: PathBuf,
}

impl FsInstaller {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }
}

impl Installer for FsInstaller {
    fn root(&self) -> &Path {
        &self.root
    }

    fn install_file(&self, relative: &Path, source: &Path) -> Result<()> {
        let target = self.root.join(relative);
        let unwritable = |operation: &str| AutocrewError::FilesystemUnwritable {
            operation: operation.to_string(),
            path: target.display().to_string(),
        };

        ensure_parent_dir(&target).context(unwritable("create parent directory"))?;
        std::fs::copy(source, &target)
            .with_context(|| format!("Failed to copy {}", source.display()))
            .context(unwritable("replace file"))?;
        debug!("Installed {}", relative.display());
        Ok(())
    }

    fn write_config(&self, doc: &ConfigDocument) -> Result<()> {
        let path = self.config_path();
        atomic_write(&path, doc.render().as_bytes()).context(
            AutocrewError::FilesystemUnwritable {
                operation: "write merged configuration".to_string(),
                path: path.display().to_string(),
            },
        )?;
        debug!("Wrote merged configuration to {}", path.display());
        Ok(())
    }
}
