//! Streaming copy-or-substitute between containers.
//!
//! The transcoder reads every entry of a source container in order and
//! writes a corresponding entry into a fresh zip container. Entries whose
//! path is in the [`PatchTable`] get the payload as their data; their
//! metadata is copied from the source with only the size changed. All
//! other entries are copied unchanged.
//!
//! # Example
//!
//! ```rust,no_run
//! use nwpatch::progress::NoProgress;
//! use nwpatch::{PatchTable, Transcoder};
//!
//! let table: PatchTable = [("img/atlas0.png", b"BB".to_vec())].into_iter().collect();
//! let result = Transcoder::new(&table).run(
//!     "package.nw.backup".as_ref(),
//!     "package.nw".as_ref(),
//!     &mut NoProgress,
//! )?;
//! println!("Replaced {} entries", result.entries_replaced);
//! # Ok::<(), nwpatch::Error>(())
//! ```

use std::io::{self, Read, Seek, Write};
use std::path::Path;

use crate::entry::{EntryDescriptor, EntryMethod};
use crate::patch::PatchTable;
use crate::progress::{EntryAction, PatchProgress};
use crate::read::SourceArchive;
use crate::write::ZipSink;
use crate::{Error, Result};

/// Result of a transcode run.
#[must_use = "transcode result should be checked to verify every entry was processed"]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscodeResult {
    /// Number of entries copied unchanged.
    pub entries_copied: usize,
    /// Number of entries whose data was replaced by a payload.
    pub entries_replaced: usize,
    /// Total entry data bytes written (before zip compression).
    pub bytes_written: u64,
    /// Size of the largest entry copied through the scratch buffer.
    pub largest_entry: u64,
}

impl TranscodeResult {
    /// Returns the total number of entries in the destination.
    pub fn total_entries(&self) -> usize {
        self.entries_copied + self.entries_replaced
    }
}

/// Reusable buffer holding one entry's data at a time.
///
/// The buffer grows to fit the largest entry seen and never shrinks.
#[derive(Debug, Default)]
pub struct ScratchBuffer {
    buf: Vec<u8>,
}

impl ScratchBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current buffer size in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing has been buffered yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Reads exactly `size` bytes of entry data and returns them.
    ///
    /// The source must end right after `size` bytes. One extra read
    /// confirms this, which also lets checksumming readers validate the
    /// entry.
    pub fn read_entry(&mut self, reader: &mut dyn Read, path: &str, size: u64) -> Result<&[u8]> {
        let len = usize::try_from(size)
            .map_err(|_| Error::data(path, "entry does not fit in memory"))?;
        if len > self.buf.len() {
            log::debug!(
                "Growing scratch buffer from {} to {} bytes",
                self.buf.len(),
                len
            );
            self.buf.resize(len, 0);
        }

        reader
            .read_exact(&mut self.buf[..len])
            .map_err(|e| Error::data(path, e))?;

        let mut probe = [0u8; 1];
        loop {
            match reader.read(&mut probe) {
                Ok(0) => break,
                Ok(_) => {
                    return Err(Error::data(
                        path,
                        format!("entry holds more than its declared {} bytes", size),
                    ));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::data(path, e)),
            }
        }

        Ok(&self.buf[..len])
    }
}

/// Copies a container while substituting patched entries.
#[derive(Debug, Clone, Copy)]
pub struct Transcoder<'a> {
    table: &'a PatchTable,
    default_method: EntryMethod,
}

impl<'a> Transcoder<'a> {
    /// Creates a transcoder for `table`.
    pub fn new(table: &'a PatchTable) -> Self {
        Self {
            table,
            default_method: EntryMethod::default(),
        }
    }

    /// Sets the zip method for entries whose source is not a zip container.
    pub fn default_method(mut self, method: EntryMethod) -> Self {
        self.default_method = method;
        self
    }

    /// Transcodes the container at `source` into a new zip at `dest`.
    ///
    /// `dest` is created or truncated. On error it is left partially
    /// written; cleaning it up is the caller's concern.
    pub fn run(
        &self,
        source: &Path,
        dest: &Path,
        progress: &mut dyn PatchProgress,
    ) -> Result<TranscodeResult> {
        let mut archive = SourceArchive::open(source)?;
        log::debug!(
            "Reading {} (filter: {})",
            source.display(),
            archive.detected().filter
        );
        let mut sink = ZipSink::create(dest)?.default_method(self.default_method);
        let result = self.transcode(&mut archive, &mut sink, progress)?;
        sink.finish()?;
        log::info!(
            "Wrote {} entries ({} replaced) to {}",
            result.total_entries(),
            result.entries_replaced,
            dest.display()
        );
        Ok(result)
    }

    /// Streams every entry of `source` into `sink`.
    ///
    /// The sink is not finished, so callers can inspect or extend it.
    pub fn transcode<W: Write + Seek>(
        &self,
        source: &mut SourceArchive,
        sink: &mut ZipSink<W>,
        progress: &mut dyn PatchProgress,
    ) -> Result<TranscodeResult> {
        let mut result = TranscodeResult::default();
        let mut scratch = ScratchBuffer::new();

        source.for_each_entry(|desc, data| {
            if let Some(patch) = self.table.get(&desc.path) {
                if !desc.has_data() {
                    return Err(Error::header(
                        desc.path.clone(),
                        format!("cannot patch a {} entry", desc.file_type.name()),
                    ));
                }
                log::info!("Replacing {}", desc.path);
                // Source data is never read for a replaced entry
                let patched = desc.with_size(patch.payload_len());
                sink.write_header(&patched)?;
                sink.write_data(patch.payload())?;

                result.entries_replaced += 1;
                result.bytes_written += patched.size;
                progress.on_entry(&patched, EntryAction::Replaced);
                return Ok(());
            }

            log::info!("Copying {}", desc.path);
            copy_entry(&desc, data, sink, &mut scratch)?;
            if desc.has_data() {
                result.bytes_written += desc.size;
                result.largest_entry = result.largest_entry.max(desc.size);
            }
            result.entries_copied += 1;
            progress.on_entry(&desc, EntryAction::Copied);
            Ok(())
        })?;

        Ok(result)
    }
}

/// Writes the source descriptor unchanged, then its data.
fn copy_entry<W: Write + Seek>(
    desc: &EntryDescriptor,
    data: &mut dyn Read,
    sink: &mut ZipSink<W>,
    scratch: &mut ScratchBuffer,
) -> Result<()> {
    sink.write_header(desc)?;
    if desc.has_data() {
        let bytes = scratch.read_entry(data, &desc.path, desc.size)?;
        sink.write_data(bytes)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_scratch_buffer_grows_never_shrinks() {
        let mut scratch = ScratchBuffer::new();
        assert!(scratch.is_empty());

        let data = scratch.read_entry(&mut &[7u8; 100][..], "a", 100).unwrap();
        assert_eq!(data.len(), 100);
        assert_eq!(scratch.len(), 100);

        let data = scratch.read_entry(&mut &b"xy"[..], "b", 2).unwrap();
        assert_eq!(data, b"xy");
        assert_eq!(scratch.len(), 100);
    }

    #[test]
    fn test_scratch_buffer_short_read() {
        let mut scratch = ScratchBuffer::new();
        let err = scratch.read_entry(&mut &b"abc"[..], "short", 10).unwrap_err();
        assert!(matches!(err, Error::Data { ref path, .. } if path == "short"));
    }

    #[test]
    fn test_scratch_buffer_trailing_data() {
        let mut scratch = ScratchBuffer::new();
        let err = scratch
            .read_entry(&mut &b"abcdef"[..], "long", 3)
            .unwrap_err();
        assert!(err.to_string().contains("more than its declared"));
    }

    #[test]
    fn test_copy_entry_skips_data_for_directories() {
        let mut sink = ZipSink::new(Cursor::new(Vec::new()));
        let mut scratch = ScratchBuffer::new();
        copy_entry(
            &EntryDescriptor::directory("img/"),
            &mut &b"ignored"[..],
            &mut sink,
            &mut scratch,
        )
        .unwrap();
        assert!(scratch.is_empty());
        assert_eq!(sink.entries(), 1);
    }

    #[test]
    fn test_total_entries() {
        let result = TranscodeResult {
            entries_copied: 3,
            entries_replaced: 2,
            ..Default::default()
        };
        assert_eq!(result.total_entries(), 5);
    }
}
