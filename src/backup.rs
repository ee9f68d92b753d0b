//! Single-generation backup of the container file.
//!
//! The backup is made by renaming the original, so no bytes are copied on
//! the happy path. An existing backup is treated as authoritative and never
//! overwritten: it is the pristine copy left by an earlier run.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Default suffix appended to the container path.
pub const DEFAULT_SUFFIX: &str = ".backup";

/// The relationship between an original path and its backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    /// Path of the container being patched.
    pub original: PathBuf,
    /// Path holding the pristine copy.
    pub backup: PathBuf,
    /// Whether this call created the backup (false if it already existed).
    pub created: bool,
}

/// Creates and restores backups.
#[derive(Debug, Clone)]
pub struct BackupManager {
    suffix: String,
}

impl Default for BackupManager {
    fn default() -> Self {
        Self::new(DEFAULT_SUFFIX)
    }
}

impl BackupManager {
    /// Creates a manager appending `suffix` to container paths.
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    /// Returns the backup suffix.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Returns the backup path for `original`.
    pub fn backup_path(&self, original: &Path) -> PathBuf {
        let mut path = OsString::from(original.as_os_str());
        path.push(&self.suffix);
        PathBuf::from(path)
    }

    /// Moves `original` aside, unless a backup already exists.
    ///
    /// After this call `original` no longer holds the pristine data: either
    /// it was just renamed, or a previous run already replaced it.
    pub fn backup(&self, original: &Path) -> Result<BackupRecord> {
        let backup = self.backup_path(original);
        let mut record = BackupRecord {
            original: original.to_path_buf(),
            backup,
            created: false,
        };

        let exists = record.backup.try_exists().map_err(|source| Error::Backup {
            path: record.backup.clone(),
            source,
        })?;
        if exists {
            log::info!(
                "Backup {} already exists, keeping it",
                record.backup.display()
            );
            return Ok(record);
        }

        match fs::rename(original, &record.backup) {
            Ok(()) => {
                log::info!("Created backup {}", record.backup.display());
                record.created = true;
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                log::warn!(
                    "Backup {} appeared concurrently, keeping it",
                    record.backup.display()
                );
            }
            Err(source) => {
                return Err(Error::Backup {
                    path: record.backup,
                    source,
                });
            }
        }

        Ok(record)
    }

    /// Replaces whatever is at the original path with the backup's contents.
    ///
    /// A missing original is fine. The copy is attempted exactly once.
    pub fn restore(&self, record: &BackupRecord) -> Result<()> {
        let restore_error = |source: io::Error| Error::Restore {
            path: record.original.clone(),
            source,
        };

        match fs::remove_file(&record.original) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(restore_error(e)),
        }

        let bytes = fs::copy(&record.backup, &record.original).map_err(restore_error)?;
        log::info!(
            "Restored {} from {} ({} bytes)",
            record.original.display(),
            record.backup.display(),
            bytes
        );
        Ok(())
    }
}
