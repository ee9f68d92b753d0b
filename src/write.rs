//! Sequential writing of the destination zip container.
//!
//! [`ZipSink`] mirrors the read side: one header, then that entry's data,
//! then the next header. The container never gets an outer compression
//! filter; per-entry compression is the zip format's own concern.
//!
//! Metadata that the base zip header cannot hold (uid, gid, sub-second
//! mtime) is written into extra fields, see [`crate::format::extra`].

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use zip::write::FullFileOptions;

use crate::entry::{EntryDescriptor, EntryMethod, FileType};
use crate::format::extra;
use crate::{Error, Result};

/// Path used in diagnostics for sinks not backed by a named file.
const STREAM_PATH: &str = "<stream>";

/// Permission bits a zip entry can hold.
const ZIP_PERM_MASK: u32 = 0o777;

/// A zip container being written entry by entry.
pub struct ZipSink<W: Write + Seek> {
    writer: zip::ZipWriter<W>,
    path: PathBuf,
    default_method: EntryMethod,
    current: Option<String>,
    entries: usize,
}

impl ZipSink<BufWriter<File>> {
    /// Creates (or truncates) the destination file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::open(path, e))?;
        let mut sink = Self::new(BufWriter::new(file));
        sink.path = path.to_path_buf();
        Ok(sink)
    }
}

impl<W: Write + Seek> ZipSink<W> {
    /// Wraps an arbitrary seekable writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: zip::ZipWriter::new(writer),
            path: PathBuf::from(STREAM_PATH),
            default_method: EntryMethod::default(),
            current: None,
            entries: 0,
        }
    }

    /// Sets the method for entries whose source carries none.
    pub fn default_method(mut self, method: EntryMethod) -> Self {
        self.default_method = method;
        self
    }

    /// Returns the number of headers written so far.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Starts a new entry described by `desc`.
    ///
    /// Regular files take their data through [`write_data`](Self::write_data).
    /// Directories and symlinks are complete once the header is written.
    pub fn write_header(&mut self, desc: &EntryDescriptor) -> Result<()> {
        let method = desc.compression.unwrap_or(self.default_method);
        let options = entry_options(desc, method)?;
        let bad_header = |e: zip::result::ZipError| Error::header(desc.path.clone(), e);

        match desc.file_type {
            FileType::Regular => self
                .writer
                .start_file(desc.path.as_str(), options)
                .map_err(bad_header)?,
            FileType::Directory => self
                .writer
                .add_directory(desc.path.as_str(), options)
                .map_err(bad_header)?,
            FileType::Symlink => {
                let target = desc
                    .link_target
                    .as_deref()
                    .ok_or_else(|| Error::header(desc.path.clone(), "symlink without target"))?;
                self.writer
                    .add_symlink(desc.path.as_str(), target, options)
                    .map_err(bad_header)?
            }
            FileType::Other(bits) => {
                return Err(Error::header(
                    desc.path.clone(),
                    format!("unsupported entry type {:#o}", bits),
                ));
            }
        }

        self.current = Some(desc.path.clone());
        self.entries += 1;
        Ok(())
    }

    /// Appends data to the current entry.
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        let path = self.current.as_deref().unwrap_or_default();
        self.writer
            .write_all(data)
            .map_err(|e| Error::data(path, e))
    }

    /// Writes the central directory and returns the underlying writer.
    pub fn finish(self) -> Result<W> {
        let path = self.path;
        let mut inner = self.writer.finish().map_err(|e| Error::finish(&path, e))?;
        inner.flush().map_err(|e| Error::finish(&path, e))?;
        log::debug!("Finished {} with {} entries", path.display(), self.entries);
        Ok(inner)
    }
}

/// Builds the zip options for one entry.
fn entry_options(desc: &EntryDescriptor, method: EntryMethod) -> Result<FullFileOptions<'static>> {
    let special = desc.perm & !ZIP_PERM_MASK;
    if special != 0 {
        log::warn!(
            "{}: zip entries cannot carry mode bits {:#o}, writing {:#o}",
            desc.path,
            special,
            desc.perm & ZIP_PERM_MASK
        );
    }

    let mut options = FullFileOptions::default()
        .compression_method(method.to_zip())
        .last_modified_time(desc.mtime.to_dos())
        .unix_permissions(desc.perm)
        .large_file(desc.size > u64::from(u32::MAX));

    for (id, data) in extra::encode(desc.mtime, desc.uid, desc.gid) {
        options
            .add_extra_data(id, data, false)
            .map_err(|e| Error::header(desc.path.clone(), e))?;
    }

    Ok(options)
}
