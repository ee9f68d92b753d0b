//! # nwpatch
//!
//! Transactional patching of application asset containers.
//!
//! Given an existing container file (a zip or tar archive, optionally
//! compressed), `nwpatch` writes a new zip container with the same entries
//! in the same order, substituting the data of entries listed in a
//! [`PatchTable`]. The original is moved aside as a backup first and
//! restored if anything goes wrong while writing.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nwpatch::progress::NoProgress;
//! use nwpatch::{PatchTable, Patcher, default_locator, patch::DEFAULT_TARGETS};
//!
//! fn main() -> nwpatch::Result<()> {
//!     let table = PatchTable::load_targets("package", DEFAULT_TARGETS)?;
//!     let patcher = Patcher::new(default_locator(), table);
//!
//!     match patcher.run(&mut NoProgress) {
//!         Ok(report) => println!(
//!             "Replaced {} of {} entries",
//!             report.transcode.entries_replaced,
//!             report.transcode.total_entries()
//!         ),
//!         Err(failure) if failure.rolled_back() => eprintln!("Restored original: {}", failure),
//!         Err(failure) => eprintln!("{}", failure),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-level building blocks
//!
//! The transaction is built from pieces that can be used on their own:
//!
//! - [`SourceArchive`] reads entries sequentially from any supported source.
//! - [`ZipSink`] writes zip entries sequentially.
//! - [`Transcoder`] connects the two through the patch table.
//! - [`BackupManager`] handles the single-generation backup.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `gzip` | Yes | gzip-compressed tar sources |
//! | `bzip2` | Yes | bzip2-compressed tar sources |
//! | `zstd` | Yes | Zstandard-compressed tar sources |
//! | `cli` | No | The `nwpatch` command-line tool |
//!
//! ## Logging
//!
//! The library logs through the [`log`] facade. Stage transitions and
//! per-entry decisions are logged at `info`, rollback at `warn`.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod backup;
pub mod entry;
pub mod error;
pub mod format;
pub mod locate;
pub mod patch;
pub mod patcher;
pub mod progress;
pub mod read;
pub mod timestamp;
pub mod transcode;
pub mod write;

pub use backup::{BackupManager, BackupRecord};
pub use entry::{EntryDescriptor, EntryMethod, FileType};
pub use error::{Error, Result};
pub use locate::{ArchiveLocator, FixedLocator, SteamLocator, default_locator};
pub use patch::{PatchEntry, PatchTable};
pub use patcher::{PatchFailure, PatchOptions, PatchReport, PatchState, Patcher};
pub use read::SourceArchive;
pub use timestamp::MTime;
pub use transcode::{ScratchBuffer, TranscodeResult, Transcoder};
pub use write::ZipSink;

#[cfg(windows)]
pub use locate::RegistryLocator;
