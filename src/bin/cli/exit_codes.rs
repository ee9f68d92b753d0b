//! Exit codes for the CLI tool.

use nwpatch::{Error, PatchFailure};

/// Exit code constants
pub const SUCCESS: i32 = 0;
/// Failure not covered by a more specific code
pub const FAILURE: i32 = 1;
/// No container was found
pub const NOT_FOUND: i32 = 2;
/// The backup could not be created
pub const BACKUP_FAILED: i32 = 3;
/// The container could not be transcoded; the original was restored
pub const BAD_ARCHIVE: i32 = 4;
/// The original could not be restored after a failure
pub const ROLLBACK_FAILED: i32 = 5;
/// Invalid command line arguments
pub const BAD_ARGS: i32 = 255;

/// Exit code enum for structured handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    Failure,
    NotFound,
    BackupFailed,
    BadArchive,
    RollbackFailed,
    BadArgs,
}

impl ExitCode {
    /// Returns the numeric exit code
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::Failure => FAILURE,
            Self::NotFound => NOT_FOUND,
            Self::BackupFailed => BACKUP_FAILED,
            Self::BadArchive => BAD_ARCHIVE,
            Self::RollbackFailed => ROLLBACK_FAILED,
            Self::BadArgs => BAD_ARGS,
        }
    }
}

/// Converts an nwpatch error to an exit code
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    match error {
        Error::Locate { .. } => ExitCode::NotFound,
        Error::Backup { .. } => ExitCode::BackupFailed,
        Error::Open { .. } | Error::Header { .. } | Error::Data { .. } | Error::Finish { .. } => {
            ExitCode::BadArchive
        }
        Error::Restore { .. } => ExitCode::RollbackFailed,
        Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ExitCode::NotFound,
        _ => ExitCode::Failure,
    }
}

/// Converts a failed transaction to an exit code
pub fn failure_to_exit_code(failure: &PatchFailure) -> ExitCode {
    if failure.restore_error.is_some() {
        ExitCode::RollbackFailed
    } else {
        error_to_exit_code(&failure.error)
    }
}
