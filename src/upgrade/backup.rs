use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// One file copied into the backup directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    /// The live file that was copied.
    pub source: PathBuf,
    /// Where the copy was written.
    pub destination: PathBuf,
}

/// Immutable record of a snapshot.
///
/// Lists only the files that existed and were copied; paths that did not
/// exist at snapshot time are absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    entries: Vec<BackupEntry>,
    created_at: DateTime<Utc>,
}

impl Backup {
    #[must_use]
    pub fn entries(&self) -> &[BackupEntry] {
        &self.entries
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The backup copy of `source`, if it was part of this snapshot.
    #[must_use]
    pub fn destination_of(&self, source: &Path) -> Option<&Path> {
        self.entries.iter().find(|e| e.source == source).map(|e| e.destination.as_path())
    }
}

/// Snapshots mutable installation state (log and config) before an upgrade.
///
/// Backups are never pruned: each snapshot gets a timestamped name so
/// earlier ones survive, and the manager never deletes or modifies the
/// files it copies.
///
/// # Examples
///
/// ```rust,no_run
/// use autocrew::upgrade::backup::BackupManager;
/// use std::path::PathBuf;
///
/// # async fn example() -> anyhow::Result<()> {
/// let manager = BackupManager::new(PathBuf::from(".backup")).with_label("v2.1.4-to-v2.2.0");
/// let backup = manager
///     .snapshot(&[PathBuf::from("autocrew.log"), PathBuf::from("config.ini")])
///     .await?;
/// println!("{} file(s) backed up", backup.entries().len());
/// # Ok(())
/// # }
/// ```
pub struct BackupManager {
    backup_root: PathBuf,
    label: Option<String>,
}

impl BackupManager {
    pub const fn new(backup_root: PathBuf) -> Self {
        Self {
            backup_root,
            label: None,
        }
    }

    /// Add a label (e.g. the version transition) to snapshot file names.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Copy every existing path into the backup root.
    ///
    /// Creates the root when absent. Paths that do not exist are skipped,
    /// since a first run has no log yet.
    pub async fn snapshot(&self, paths: &[PathBuf]) -> Result<Backup> {
        let created_at = Utc::now();
        let mut entries = Vec::new();

        fs::create_dir_all(&self.backup_root).await.with_context(|| {
            format!("Failed to create backup directory {}", self.backup_root.display())
        })?;

        for source in paths {
            if !fs::try_exists(source).await.unwrap_or(false) {
                debug!("Skipping backup of {} (does not exist)", source.display());
                continue;
            }

            let destination = self.free_destination(source, created_at).await;
            fs::copy(source, &destination).await.with_context(|| {
                format!("Failed to back up {} to {}", source.display(), destination.display())
            })?;
            info!("Backed up {} to {}", source.display(), destination.display());

            entries.push(BackupEntry {
                source: source.clone(),
                destination,
            });
        }

        Ok(Backup {
            entries,
            created_at,
        })
    }

    /// Copy `source` to a fixed `name` in the backup root, replacing any
    /// earlier copy with that name. Returns `None` when `source` is missing.
    pub async fn preserve_as(&self, source: &Path, name: &str) -> Result<Option<PathBuf>> {
        if !fs::try_exists(source).await.unwrap_or(false) {
            debug!("Nothing to preserve at {}", source.display());
            return Ok(None);
        }

        fs::create_dir_all(&self.backup_root).await.with_context(|| {
            format!("Failed to create backup directory {}", self.backup_root.display())
        })?;

        let destination = self.backup_root.join(name);
        fs::copy(source, &destination).await.with_context(|| {
            format!("Failed to back up {} to {}", source.display(), destination.display())
        })?;
        info!("Backing up the current {} to {}", source.display(), destination.display());
        Ok(Some(destination))
    }

    /// Files currently held in the backup root, sorted by name.
    pub async fn list(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        if !fs::try_exists(&self.backup_root).await.unwrap_or(false) {
            return Ok(files);
        }

        let mut dir = fs::read_dir(&self.backup_root).await.with_context(|| {
            format!("Failed to read backup directory {}", self.backup_root.display())
        })?;
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// A destination for `source` that no earlier snapshot holds. Names
    /// carry milliseconds; a `-N` counter is appended if that still clashes.
    async fn free_destination(&self, source: &Path, at: DateTime<Utc>) -> PathBuf {
        let stem = source.file_stem().unwrap_or_default().to_string_lossy();
        let stamp = at.format("%Y%m%d-%H%M%S-%3f");
        let base = match &self.label {
            Some(label) => format!("{stem}_{label}_{stamp}"),
            None => format!("{stem}_{stamp}"),
        };
        let ext = source
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let mut destination = self.backup_root.join(format!("{base}{ext}"));
        let mut counter = 1;
        while fs::try_exists(&destination).await.unwrap_or(false) {
            destination = self.backup_root.join(format!("{base}-{counter}{ext}"));
            counter += 1;
        }
        destination
    }
}
