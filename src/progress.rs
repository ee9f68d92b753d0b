//! Progress reporting for patch transactions.
//!
//! The orchestrator reports each state transition and the transcoder reports
//! each entry as it is written. Reporters are purely observational: they
//! cannot alter or cancel a transaction.
//!
//! # Example
//!
//! ```rust
//! use nwpatch::progress::{EntryAction, PatchProgress, StatisticsProgress};
//! use nwpatch::EntryDescriptor;
//!
//! let mut stats = StatisticsProgress::new();
//! stats.on_entry(&EntryDescriptor::file("img/atlas0.png", 2), EntryAction::Replaced);
//! assert_eq!(stats.entries_replaced(), 1);
//! ```

use crate::entry::EntryDescriptor;
use crate::patcher::PatchState;

/// IEC byte unit: 1 KiB = 1024 bytes.
pub const BYTES_KIB: u64 = 1024;
/// IEC byte unit: 1 MiB = 1024 KiB.
pub const BYTES_MIB: u64 = 1024 * BYTES_KIB;
/// IEC byte unit: 1 GiB = 1024 MiB.
pub const BYTES_GIB: u64 = 1024 * BYTES_MIB;

/// What happened to an entry during transcoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryAction {
    /// Metadata and data were copied from the source.
    Copied,
    /// Data was substituted with a patch payload.
    Replaced,
}

impl EntryAction {
    /// Returns the log verb for this action.
    pub fn verb(&self) -> &'static str {
        match self {
            EntryAction::Copied => "Copying",
            EntryAction::Replaced => "Replacing",
        }
    }
}

/// Observer of a patch transaction.
///
/// Every method has a no-op default.
pub trait PatchProgress {
    /// Called when the orchestrator enters a new state.
    fn on_state(&mut self, state: PatchState) {
        let _ = state;
    }

    /// Called after an entry has been written to the destination.
    ///
    /// For replaced entries the descriptor carries the payload size.
    fn on_entry(&mut self, entry: &EntryDescriptor, action: EntryAction) {
        let _ = (entry, action);
    }
}

/// A reporter that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl PatchProgress for NoProgress {}

/// A reporter that records states and entry counts.
#[derive(Debug, Clone, Default)]
pub struct StatisticsProgress {
    states: Vec<PatchState>,
    entries_copied: usize,
    entries_replaced: usize,
    bytes_written: u64,
}

impl StatisticsProgress {
    /// Creates an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every state reported so far, in order.
    pub fn states(&self) -> &[PatchState] {
        &self.states
    }

    /// Returns the number of copied entries.
    pub fn entries_copied(&self) -> usize {
        self.entries_copied
    }

    /// Returns the number of replaced entries.
    pub fn entries_replaced(&self) -> usize {
        self.entries_replaced
    }

    /// Returns the sum of entry data sizes written.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

impl PatchProgress for StatisticsProgress {
    fn on_state(&mut self, state: PatchState) {
        self.states.push(state);
    }

    fn on_entry(&mut self, entry: &EntryDescriptor, action: EntryAction) {
        match action {
            EntryAction::Copied => self.entries_copied += 1,
            EntryAction::Replaced => self.entries_replaced += 1,
        }
        if entry.has_data() {
            self.bytes_written += entry.size;
        }
    }
}

impl<P: PatchProgress + ?Sized> PatchProgress for &mut P {
    fn on_state(&mut self, state: PatchState) {
        (**self).on_state(state);
    }

    fn on_entry(&mut self, entry: &EntryDescriptor, action: EntryAction) {
        (**self).on_entry(entry, action);
    }
}

/// Formats a byte count using IEC units.
pub fn format_bytes_iec(bytes: u64) -> String {
    if bytes < BYTES_KIB {
        format!("{} B", bytes)
    } else if bytes < BYTES_MIB {
        format!("{:.1} KiB", bytes as f64 / BYTES_KIB as f64)
    } else if bytes < BYTES_GIB {
        format!("{:.1} MiB", bytes as f64 / BYTES_MIB as f64)
    } else {
        format!("{:.1} GiB", bytes as f64 / BYTES_GIB as f64)
    }
}
