//! Spinner display for a patch transaction.

use indicatif::{ProgressBar, ProgressStyle};
use nwpatch::progress::{EntryAction, PatchProgress};
use nwpatch::{EntryDescriptor, PatchState};

/// Progress display for the CLI
pub struct CliProgress {
    bar: ProgressBar,
    replaced: u64,
}

impl CliProgress {
    /// Creates a new spinner, hidden when `quiet`
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            let template = "{spinner:.green} [{elapsed_precise}] {pos} entries {wide_msg}";
            if let Ok(style) = ProgressStyle::default_spinner().template(template) {
                pb.set_style(style);
            }
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            pb
        };

        Self { bar, replaced: 0 }
    }

    /// Finishes the spinner, leaving a summary line
    pub fn finish(&self, state: PatchState) {
        self.bar.finish_with_message(format!("{} ({} replaced)", state, self.replaced));
    }
}

impl PatchProgress for CliProgress {
    fn on_state(&mut self, state: PatchState) {
        self.bar.set_message(state.name());
    }

    fn on_entry(&mut self, entry: &EntryDescriptor, action: EntryAction) {
        if action == EntryAction::Replaced {
            self.replaced += 1;
        }

        // Truncate long names
        let name = &entry.path;
        let display_name = match name.char_indices().rev().nth(36) {
            Some((start, _)) if name.len() > 40 => format!("...{}", &name[start..]),
            _ => name.clone(),
        };
        self.bar.set_message(format!("{} {}", action.verb(), display_name));
        self.bar.inc(1);
    }
}
