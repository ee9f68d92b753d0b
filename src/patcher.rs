//! The patch transaction.
//!
//! [`Patcher`] sequences locate, backup, transcode and, on a transcode
//! failure, restore. The transaction runs once per call and is strictly
//! linear:
//!
//! ```text
//! Idle -> Located -> BackedUp -> Transcoding -> Succeeded
//!                                     |
//!                                     +-> Failed -> RolledBack
//! ```
//!
//! A failure before the backup exists ends in `Failed` without touching the
//! file system. A failed restore is logged and reported alongside the
//! original error, and the outcome stays `Failed`.
//!
//! # Example
//!
//! ```rust,no_run
//! use nwpatch::progress::NoProgress;
//! use nwpatch::{FixedLocator, PatchTable, Patcher};
//!
//! let table: PatchTable = [("img/atlas0.png", b"BB".to_vec())].into_iter().collect();
//! let patcher = Patcher::new(FixedLocator::new("package.nw"), table);
//! match patcher.run(&mut NoProgress) {
//!     Ok(report) => println!("Patched {}", report.archive.display()),
//!     Err(failure) => eprintln!("{} ({})", failure, failure.state),
//! }
//! ```

use std::path::PathBuf;

use crate::backup::{BackupManager, BackupRecord, DEFAULT_SUFFIX};
use crate::entry::EntryMethod;
use crate::locate::ArchiveLocator;
use crate::patch::PatchTable;
use crate::progress::PatchProgress;
use crate::transcode::{TranscodeResult, Transcoder};
use crate::Error;

/// State of a patch transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchState {
    /// Nothing has happened yet.
    Idle,
    /// The container path is known.
    Located,
    /// A backup exists; the original path may now be overwritten.
    BackedUp,
    /// Entries are being streamed into the new container.
    Transcoding,
    /// The new container is complete.
    Succeeded,
    /// The transaction failed.
    Failed,
    /// The transaction failed and the original content was restored.
    RolledBack,
}

impl PatchState {
    /// Returns a human-readable name for this state.
    pub fn name(&self) -> &'static str {
        match self {
            PatchState::Idle => "idle",
            PatchState::Located => "located",
            PatchState::BackedUp => "backed up",
            PatchState::Transcoding => "transcoding",
            PatchState::Succeeded => "succeeded",
            PatchState::Failed => "failed",
            PatchState::RolledBack => "rolled back",
        }
    }

    /// Returns true for states that end a transaction.
    ///
    /// `Failed` is followed by `RolledBack` when a restore succeeds.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PatchState::Succeeded | PatchState::Failed | PatchState::RolledBack
        )
    }
}

impl std::fmt::Display for PatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Options for a patch transaction.
#[derive(Debug, Clone)]
pub struct PatchOptions {
    backup_suffix: String,
    default_method: EntryMethod,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            backup_suffix: DEFAULT_SUFFIX.to_string(),
            default_method: EntryMethod::default(),
        }
    }
}

impl PatchOptions {
    /// Creates the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the suffix appended to the container path for the backup.
    pub fn backup_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.backup_suffix = suffix.into();
        self
    }

    /// Sets the zip method for entries whose source is not a zip container.
    pub fn default_method(mut self, method: EntryMethod) -> Self {
        self.default_method = method;
        self
    }

    /// Returns the backup suffix.
    pub fn get_backup_suffix(&self) -> &str {
        &self.backup_suffix
    }

    /// Returns the default entry method.
    pub fn get_default_method(&self) -> EntryMethod {
        self.default_method
    }
}

/// Outcome of a successful transaction.
#[derive(Debug, Clone)]
pub struct PatchReport {
    /// The patched container.
    pub archive: PathBuf,
    /// The backup used as the transcode source.
    pub backup: BackupRecord,
    /// Per-entry counts.
    pub transcode: TranscodeResult,
}

/// Outcome of a failed transaction.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct PatchFailure {
    /// The error that ended the transaction.
    pub error: Error,
    /// Terminal state: [`PatchState::Failed`] or [`PatchState::RolledBack`].
    pub state: PatchState,
    /// State the transaction was in when `error` happened.
    pub failed_in: PatchState,
    /// The container path, if it was located.
    pub archive: Option<PathBuf>,
    /// Error from the rollback attempt, if it failed.
    pub restore_error: Option<Error>,
}

impl PatchFailure {
    /// Returns true if the original content was restored.
    pub fn rolled_back(&self) -> bool {
        self.state == PatchState::RolledBack
    }
}

/// Runs one patch transaction against a located container.
pub struct Patcher<L: ArchiveLocator> {
    locator: L,
    table: PatchTable,
    options: PatchOptions,
}

impl<L: ArchiveLocator> Patcher<L> {
    /// Creates a patcher with default options.
    pub fn new(locator: L, table: PatchTable) -> Self {
        Self {
            locator,
            table,
            options: PatchOptions::default(),
        }
    }

    /// Sets the transaction options.
    pub fn options(mut self, options: PatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the patch table.
    pub fn table(&self) -> &PatchTable {
        &self.table
    }

    /// Runs the transaction.
    pub fn run(&self, progress: &mut dyn PatchProgress) -> Result<PatchReport, PatchFailure> {
        let mut transaction = Transaction {
            state: PatchState::Idle,
            progress,
        };
        transaction.enter(PatchState::Idle);

        log::info!("Searching container");
        let archive = self
            .locator
            .locate()
            .map_err(|error| transaction.fail(error, None))?;
        log::info!("Found container {}", archive.display());
        transaction.enter(PatchState::Located);

        let backups = BackupManager::new(self.options.backup_suffix.clone());
        let record = backups
            .backup(&archive)
            .map_err(|error| transaction.fail(error, Some(&archive)))?;
        transaction.enter(PatchState::BackedUp);

        log::info!("Patching container {}", archive.display());
        transaction.enter(PatchState::Transcoding);
        let transcoder = Transcoder::new(&self.table).default_method(self.options.default_method);
        let result = transcoder.run(&record.backup, &record.original, &mut *transaction.progress);

        match result {
            Ok(transcode) => {
                transaction.enter(PatchState::Succeeded);
                Ok(PatchReport {
                    archive,
                    backup: record,
                    transcode,
                })
            }
            Err(error) => {
                let mut failure = transaction.fail(error, Some(&archive));
                log::warn!("Rolling back {}", archive.display());
                match backups.restore(&record) {
                    Ok(()) => {
                        failure.state = PatchState::RolledBack;
                        transaction.enter(PatchState::RolledBack);
                    }
                    Err(restore_error) => {
                        log::error!("Rollback failed: {}", restore_error);
                        failure.restore_error = Some(restore_error);
                    }
                }
                Err(failure)
            }
        }
    }
}

struct Transaction<'p> {
    state: PatchState,
    progress: &'p mut dyn PatchProgress,
}

impl Transaction<'_> {
    fn enter(&mut self, state: PatchState) {
        log::debug!("{} -> {}", self.state, state);
        self.state = state;
        self.progress.on_state(state);
    }

    fn fail(&mut self, error: Error, archive: Option<&PathBuf>) -> PatchFailure {
        log::error!("{} failed: {}", error.operation(), error);
        let failed_in = self.state;
        self.enter(PatchState::Failed);
        PatchFailure {
            error,
            state: PatchState::Failed,
            failed_in,
            archive: archive.cloned(),
            restore_error: None,
        }
    }
}
