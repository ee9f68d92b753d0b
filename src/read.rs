//! Sequential reading of source containers.
//!
//! [`SourceArchive`] opens a container of any supported filter/format
//! combination and hands each entry to a visitor as an
//! [`EntryDescriptor`] plus a reader over the entry's data, strictly in
//! source order. Nothing beyond the current entry is held in memory.
//!
//! # Example
//!
//! ```rust,no_run
//! use nwpatch::read::SourceArchive;
//!
//! let mut source = SourceArchive::open("package.nw.backup")?;
//! let count = source.for_each_entry(|entry, _data| {
//!     println!("{} ({} bytes)", entry.path, entry.size);
//!     Ok(())
//! })?;
//! println!("{} entries", count);
//! # Ok::<(), nwpatch::Error>(())
//! ```

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::entry::{EntryDescriptor, EntryMethod, FileType, PERM_MASK, S_IFMT};
use crate::format::detect::{ContainerFormat, Detected, Filter, detect_format};
use crate::format::extra;
use crate::timestamp::MTime;
use crate::{Error, Result};

enum Inner {
    Zip(zip::ZipArchive<BufReader<File>>),
    Tar(tar::Archive<Box<dyn Read>>),
}

/// A source container opened for sequential reading.
pub struct SourceArchive {
    path: PathBuf,
    detected: Detected,
    inner: Inner,
}

impl SourceArchive {
    /// Opens a container, detecting its compression filter and format.
    ///
    /// Fails with [`Error::Open`] if the file cannot be opened, the format is
    /// not recognized, or the filter is not compiled in.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| Error::open(path, e))?;
        let detected = detect_format(&mut file).map_err(|e| Error::open(path, e))?;

        let format = detected
            .format
            .ok_or_else(|| Error::open(path, "unrecognized container format"))?;
        log::debug!(
            "Detected {} container (filter: {}) at {}",
            format,
            detected.filter,
            path.display()
        );

        let inner = match format {
            ContainerFormat::Zip => {
                let archive =
                    zip::ZipArchive::new(BufReader::new(file)).map_err(|e| Error::open(path, e))?;
                Inner::Zip(archive)
            }
            ContainerFormat::Tar => {
                if !detected.filter.is_supported() {
                    let reason = format!("{} compression is not supported", detected.filter);
                    return Err(Error::open(path, reason));
                }
                let reader = open_filter(file, detected.filter).map_err(|e| Error::open(path, e))?;
                Inner::Tar(tar::Archive::new(reader))
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            detected,
            inner,
        })
    }

    /// Returns the container path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the detected filter and format.
    pub fn detected(&self) -> Detected {
        self.detected
    }

    /// Visits every entry in source order.
    ///
    /// The visitor receives the entry's descriptor and a reader positioned at
    /// the start of its data. It may leave the data unread. The first error,
    /// from reading or from the visitor, stops the walk.
    ///
    /// Returns the number of entries visited.
    pub fn for_each_entry<F>(&mut self, mut visit: F) -> Result<usize>
    where
        F: FnMut(EntryDescriptor, &mut dyn Read) -> Result<()>,
    {
        let mut count = 0;

        match &mut self.inner {
            Inner::Zip(archive) => {
                for index in 0..archive.len() {
                    let mut file = archive
                        .by_index(index)
                        .map_err(|e| Error::header(format!("#{}", index), e))?;

                    let mut desc = zip_descriptor(
                        file.name(),
                        file.is_dir(),
                        file.unix_mode(),
                        file.size(),
                        file.extra_data(),
                        file.last_modified(),
                        file.compression(),
                    );

                    // Zip stores the link target as entry data; tar keeps it
                    // in the header with a zero size
                    if desc.file_type == FileType::Symlink {
                        let mut target = String::new();
                        file.read_to_string(&mut target)
                            .map_err(|e| Error::data(&desc.path, e))?;
                        desc.link_target = Some(target);
                        desc.size = 0;
                    }

                    visit(desc, &mut file)?;
                    count += 1;
                }
            }
            Inner::Tar(archive) => {
                let entries = archive.entries().map_err(|e| Error::header("", e))?;
                for entry in entries {
                    let mut entry = entry.map_err(|e| Error::header("", e))?;
                    if entry.header().entry_type() == tar::EntryType::XGlobalHeader {
                        log::debug!("Skipping pax global header");
                        continue;
                    }

                    let desc = tar_descriptor(&mut entry)?;
                    visit(desc, &mut entry)?;
                    count += 1;
                }
            }
        }

        Ok(count)
    }
}

/// Wraps a file in the decoder for `filter`.
fn open_filter(file: File, filter: Filter) -> io::Result<Box<dyn Read>> {
    let reader = BufReader::new(file);
    Ok(match filter {
        Filter::None => Box::new(reader),
        #[cfg(feature = "gzip")]
        Filter::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
        #[cfg(feature = "bzip2")]
        Filter::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(reader)),
        #[cfg(feature = "zstd")]
        Filter::Zstd => Box::new(zstd::stream::read::Decoder::with_buffer(reader)?),
        // Filters without a decoder are rejected by `SourceArchive::open`
        #[allow(unreachable_patterns)]
        other => {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("unsupported compression filter: {}", other),
            ));
        }
    })
}

/// Builds a descriptor from the fields of a zip entry.
fn zip_descriptor(
    name: &str,
    is_dir: bool,
    unix_mode: Option<u32>,
    size: u64,
    extra_data: Option<&[u8]>,
    last_modified: Option<zip::DateTime>,
    method: zip::CompressionMethod,
) -> EntryDescriptor {
    let file_type = if is_dir {
        FileType::Directory
    } else {
        unix_mode.map_or(FileType::Regular, FileType::from_mode)
    };
    let perm = match unix_mode {
        Some(mode) if mode & S_IFMT != 0 || mode & PERM_MASK != 0 => mode & PERM_MASK,
        _ if is_dir => 0o755,
        _ => 0o644,
    };

    let extra = extra_data.map(extra::parse).unwrap_or_default();
    let mtime = extra
        .mtime
        .or_else(|| last_modified.and_then(MTime::from_dos))
        .unwrap_or_default();

    let compression = match method {
        zip::CompressionMethod::Stored => EntryMethod::Stored,
        _ => EntryMethod::Deflated,
    };

    EntryDescriptor {
        path: name.to_string(),
        file_type,
        perm,
        uid: extra.uid.unwrap_or(0),
        gid: extra.gid.unwrap_or(0),
        size,
        mtime,
        compression: Some(compression),
        link_target: None,
    }
}

/// Metadata from an entry's pax extended header that overrides the ustar
/// fields.
#[derive(Debug, Default)]
struct PaxOverrides {
    mtime: Option<MTime>,
    uid: Option<u32>,
    gid: Option<u32>,
}

fn pax_overrides<R: Read>(entry: &mut tar::Entry<'_, R>, path: &str) -> Result<PaxOverrides> {
    let mut overrides = PaxOverrides::default();
    let Some(extensions) = entry.pax_extensions().map_err(|e| Error::header(path, e))? else {
        return Ok(overrides);
    };

    for extension in extensions {
        let extension = extension.map_err(|e| Error::header(path, e))?;
        let (Ok(key), Ok(value)) = (extension.key(), extension.value()) else {
            continue;
        };
        match key {
            "mtime" => overrides.mtime = MTime::from_pax(value),
            "uid" => overrides.uid = value.parse().ok(),
            "gid" => overrides.gid = value.parse().ok(),
            _ => continue,
        }
        log::debug!("{}: pax {}={}", path, key, value);
    }

    Ok(overrides)
}

/// Builds a descriptor from a tar entry header and its pax records.
fn tar_descriptor<R: Read>(entry: &mut tar::Entry<'_, R>) -> Result<EntryDescriptor> {
    let path = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
    let pax = pax_overrides(entry, &path)?;
    let header = entry.header();
    let bad_header = |e: io::Error| Error::header(path.clone(), e);

    let entry_type = header.entry_type();
    let file_type = if entry_type.is_file() || entry_type == tar::EntryType::Continuous {
        FileType::Regular
    } else if entry_type.is_dir() {
        FileType::Directory
    } else if entry_type.is_symlink() {
        FileType::Symlink
    } else if entry_type.is_character_special() {
        FileType::Other(0o020000)
    } else if entry_type.is_block_special() {
        FileType::Other(0o060000)
    } else if entry_type.is_fifo() {
        FileType::Other(0o010000)
    } else {
        FileType::Other(0)
    };

    let link_target = if file_type == FileType::Symlink {
        entry
            .link_name_bytes()
            .map(|name| String::from_utf8_lossy(&name).into_owned())
    } else {
        None
    };

    let uid = match pax.uid {
        Some(uid) => uid,
        None => u32::try_from(header.uid().map_err(bad_header)?)
            .map_err(|_| Error::header(path.clone(), "uid does not fit in 32 bits"))?,
    };
    let gid = match pax.gid {
        Some(gid) => gid,
        None => u32::try_from(header.gid().map_err(bad_header)?)
            .map_err(|_| Error::header(path.clone(), "gid does not fit in 32 bits"))?,
    };
    let mtime = match pax.mtime {
        Some(mtime) => mtime,
        None => i64::try_from(header.mtime().map_err(bad_header)?)
            .map(MTime::from_secs)
            .map_err(|_| Error::header(path.clone(), "mtime out of range"))?,
    };

    Ok(EntryDescriptor {
        perm: header.mode().map_err(bad_header)? & PERM_MASK,
        file_type,
        uid,
        gid,
        size: entry.size(),
        mtime,
        compression: None,
        link_target,
        path,
    })
}
