//! Error types for container patching.
//!
//! This module provides the [`Error`] enum which represents every way a
//! patch transaction can fail, along with a convenient [`Result<T>`] alias.
//!
//! # Error Handling
//!
//! Every error is terminal for the current transaction. The orchestrator
//! decides whether a rollback is needed based on the stage that failed:
//!
//! ```rust,no_run
//! use nwpatch::{Error, Result};
//!
//! fn describe(error: &Error) {
//!     if error.is_before_backup() {
//!         println!("nothing was modified: {}", error);
//!     } else {
//!         println!("{} failed, original restored: {}", error.operation(), error);
//!     }
//! }
//! ```

use std::io;
use std::path::PathBuf;

/// The main error type for patch operations.
///
/// | Stage | Variants |
/// |-------|----------|
/// | Locate | [`Locate`][Self::Locate] |
/// | Backup | [`Backup`][Self::Backup] |
/// | Transcode | [`Open`][Self::Open], [`Header`][Self::Header], [`Data`][Self::Data], [`Finish`][Self::Finish] |
/// | Rollback | [`Restore`][Self::Restore] |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error outside of any container operation.
    ///
    /// Returned for example when a patch payload cannot be read from disk.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No container file could be found.
    #[error("Container not found: {reason}")]
    Locate {
        /// Why every probed location was rejected.
        reason: String,
    },

    /// The original container could not be moved to its backup path.
    #[error("Failed to back up {}: {source}", path.display())]
    Backup {
        /// The backup path that was being created.
        path: PathBuf,
        /// The underlying rename error.
        source: io::Error,
    },

    /// A container stream could not be opened for reading or writing.
    ///
    /// This covers unknown signatures, compression filters that were not
    /// compiled in, and the file system refusing to open or create a file.
    #[error("Failed to open {}: {reason}", path.display())]
    Open {
        /// The container path.
        path: PathBuf,
        /// Diagnostic from the archive library or file system.
        reason: String,
    },

    /// An entry header could not be read or written.
    #[error("Header error for '{path}': {reason}")]
    Header {
        /// Entry path inside the container (empty if unknown).
        path: String,
        /// Diagnostic from the archive library.
        reason: String,
    },

    /// Entry data could not be read or written.
    #[error("Data error for '{path}': {reason}")]
    Data {
        /// Entry path inside the container.
        path: String,
        /// Diagnostic from the archive library.
        reason: String,
    },

    /// The destination container could not be finalized.
    #[error("Failed to finalize {}: {reason}", path.display())]
    Finish {
        /// The destination container path.
        path: PathBuf,
        /// Diagnostic from the archive library.
        reason: String,
    },

    /// Copying the backup back over the original failed.
    #[error("Failed to restore {}: {source}", path.display())]
    Restore {
        /// The path that was being restored.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
}

impl Error {
    /// Returns the name of the operation that failed.
    ///
    /// Used to prefix operator-facing diagnostics.
    pub fn operation(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Locate { .. } => "locate",
            Error::Backup { .. } => "backup",
            Error::Open { .. } => "open",
            Error::Header { .. } => "header",
            Error::Data { .. } => "data",
            Error::Finish { .. } => "finish",
            Error::Restore { .. } => "restore",
        }
    }

    /// Returns true if this error can only happen before the backup exists.
    ///
    /// Such failures leave the container untouched, so no rollback is due.
    pub fn is_before_backup(&self) -> bool {
        matches!(self, Error::Locate { .. } | Error::Backup { .. })
    }

    /// Returns the entry path if this error relates to a single entry.
    pub fn entry_path(&self) -> Option<&str> {
        match self {
            Error::Header { path, .. } | Error::Data { path, .. } if !path.is_empty() => {
                Some(path)
            }
            _ => None,
        }
    }

    /// Creates an `Open` error.
    pub fn open(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Open {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `Header` error.
    pub fn header(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::Header {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `Data` error.
    pub fn data(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::Data {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `Finish` error.
    pub fn finish(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Finish {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// A specialized Result type for patch operations.
pub type Result<T> = std::result::Result<T, Error>;
