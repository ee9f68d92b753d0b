//! Shared test utilities for integration tests.
//!
//! Fixture containers are built with the `zip` and `tar` crates directly, and
//! outputs are read back through [`SourceArchive`] so descriptors can be
//! compared field by field.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;

use nwpatch::{EntryDescriptor, SourceArchive};
use zip::write::SimpleFileOptions;

/// Bytes of `img/atlas0.png` in the reference fixture.
pub const ORIGINAL_ATLAS: &[u8] = b"AAAAAAAAAA";
/// Replacement payload for `img/atlas0.png`.
pub const PATCHED_ATLAS: &[u8] = b"BB";

/// Kind of a tar fixture entry.
#[derive(Debug, Clone)]
pub enum TarKind {
    File(Vec<u8>),
    Directory,
    Symlink(String),
    Fifo,
}

/// One entry of a tar fixture.
#[derive(Debug, Clone)]
pub struct TarEntry {
    pub path: String,
    pub kind: TarKind,
    pub mode: u32,
    pub mtime: u64,
    pub uid: u64,
    pub gid: u64,
    /// Pax extended header records written before the entry.
    pub pax: Vec<(String, String)>,
}

impl TarEntry {
    /// A regular file with mode 0644 and mtime 1000.
    pub fn file(path: &str, data: &[u8]) -> Self {
        Self {
            path: path.to_string(),
            kind: TarKind::File(data.to_vec()),
            mode: 0o644,
            mtime: 1000,
            uid: 1000,
            gid: 100,
            pax: Vec::new(),
        }
    }

    /// A directory with mode 0755.
    pub fn directory(path: &str) -> Self {
        Self {
            kind: TarKind::Directory,
            mode: 0o755,
            ..Self::file(path, b"")
        }
    }

    /// A symlink pointing at `target`.
    pub fn symlink(path: &str, target: &str) -> Self {
        Self {
            kind: TarKind::Symlink(target.to_string()),
            mode: 0o777,
            ..Self::file(path, b"")
        }
    }

    /// A named pipe.
    pub fn fifo(path: &str) -> Self {
        Self {
            kind: TarKind::Fifo,
            ..Self::file(path, b"")
        }
    }

    /// Adds a pax extended header record.
    pub fn with_pax(mut self, key: &str, value: &str) -> Self {
        self.pax.push((key.to_string(), value.to_string()));
        self
    }
}

/// Builds an uncompressed tar archive.
pub fn tar_bytes(entries: &[TarEntry]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());

    for entry in entries {
        if !entry.pax.is_empty() {
            builder
                .append_pax_extensions(
                    entry
                        .pax
                        .iter()
                        .map(|(key, value)| (key.as_str(), value.as_bytes())),
                )
                .unwrap();
        }

        let mut header = tar::Header::new_gnu();
        header.set_mode(entry.mode);
        header.set_mtime(entry.mtime);
        header.set_uid(entry.uid);
        header.set_gid(entry.gid);

        match &entry.kind {
            TarKind::File(data) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(data.len() as u64);
                builder
                    .append_data(&mut header, &entry.path, data.as_slice())
                    .unwrap();
            }
            TarKind::Directory => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                builder
                    .append_data(&mut header, &entry.path, std::io::empty())
                    .unwrap();
            }
            TarKind::Symlink(target) => {
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_size(0);
                builder
                    .append_link(&mut header, &entry.path, target)
                    .unwrap();
            }
            TarKind::Fifo => {
                header.set_entry_type(tar::EntryType::Fifo);
                header.set_size(0);
                builder
                    .append_data(&mut header, &entry.path, std::io::empty())
                    .unwrap();
            }
        }
    }

    builder.into_inner().unwrap()
}

/// Compresses `data` with gzip.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Builds a zip archive of regular files (Deflated, mode 0644).
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    zip_bytes_with(entries, zip::CompressionMethod::Deflated)
}

/// Builds a zip archive of regular files with the given method.
pub fn zip_bytes_with(entries: &[(&str, &[u8])], method: zip::CompressionMethod) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(method)
        .unix_permissions(0o644);

    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
    }

    writer.finish().unwrap().into_inner()
}

/// Reads every entry of a container through [`SourceArchive`].
pub fn read_entries(path: &Path) -> Vec<(EntryDescriptor, Vec<u8>)> {
    let mut source = SourceArchive::open(path).unwrap();
    let mut entries = Vec::new();
    source
        .for_each_entry(|desc, data| {
            let mut bytes = Vec::new();
            if desc.has_data() {
                data.read_to_end(&mut bytes)?;
            }
            entries.push((desc, bytes));
            Ok(())
        })
        .unwrap();
    entries
}

/// Returns the entry paths of a container in order.
pub fn entry_names(path: &Path) -> Vec<String> {
    read_entries(path)
        .into_iter()
        .map(|(desc, _)| desc.path)
        .collect()
}

/// Ignores the fields a transcode is allowed to change on a pass-through
/// entry from a non-zip source.
pub fn comparable(desc: &EntryDescriptor) -> EntryDescriptor {
    EntryDescriptor {
        compression: None,
        ..desc.clone()
    }
}
