//! Output formatting for CLI operations.

use nwpatch::progress::format_bytes_iec;
use nwpatch::{PatchFailure, PatchReport};
use serde_json::json;

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats a successful transaction
    fn format_report(&self, report: &PatchReport) -> String;

    /// Formats a failed transaction
    fn format_failure(&self, failure: &PatchFailure) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_report(&self, report: &PatchReport) -> String {
        let result = &report.transcode;
        let mut output = String::new();

        output.push_str("Patch Complete:\n");
        output.push_str(&"-".repeat(40));
        output.push('\n');
        output.push_str(&format!("  Container:      {}\n", report.archive.display()));
        output.push_str(&format!(
            "  Backup:         {} ({})\n",
            report.backup.backup.display(),
            if report.backup.created {
                "created"
            } else {
                "kept existing"
            }
        ));
        output.push_str(&format!(
            "  Entries:        {} ({} replaced, {} copied)\n",
            result.total_entries(),
            result.entries_replaced,
            result.entries_copied
        ));
        output.push_str(&format!(
            "  Data written:   {}\n",
            format_bytes_iec(result.bytes_written)
        ));
        output.push_str(&format!(
            "  Largest entry:  {}\n",
            format_bytes_iec(result.largest_entry)
        ));

        output
    }

    fn format_failure(&self, failure: &PatchFailure) -> String {
        let mut output = format!(
            "Error: {} failed: {}\n",
            failure.error.operation(),
            failure.error
        );

        if failure.rolled_back() {
            output.push_str("The original container was restored from the backup.\n");
        } else if let Some(restore_error) = &failure.restore_error {
            output.push_str(&format!("Rollback failed: {}\n", restore_error));
            output.push_str("The pristine container is still available as the backup file.\n");
        } else {
            output.push_str("Nothing was modified.\n");
        }

        output
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &PatchReport) -> String {
        let result = &report.transcode;
        let output = json!({
            "success": true,
            "archive": report.archive.display().to_string(),
            "backup": report.backup.backup.display().to_string(),
            "backup_created": report.backup.created,
            "entries_total": result.total_entries(),
            "entries_replaced": result.entries_replaced,
            "entries_copied": result.entries_copied,
            "bytes_written": result.bytes_written,
            "largest_entry": result.largest_entry,
        });
        serde_json::to_string_pretty(&output).unwrap_or_default()
    }

    fn format_failure(&self, failure: &PatchFailure) -> String {
        let output = json!({
            "success": false,
            "operation": failure.error.operation(),
            "error": failure.error.to_string(),
            "entry": failure.error.entry_path(),
            "state": failure.state.name(),
            "failed_in": failure.failed_in.name(),
            "archive": failure.archive.as_ref().map(|p| p.display().to_string()),
            "rolled_back": failure.rolled_back(),
            "restore_error": failure.restore_error.as_ref().map(ToString::to_string),
        });
        serde_json::to_string_pretty(&output).unwrap_or_default()
    }
}

/// Creates a formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}
