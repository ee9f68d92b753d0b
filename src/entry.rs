//! Per-entry metadata as read from a source container.

use crate::timestamp::MTime;

/// Unix file type mask.
pub const S_IFMT: u32 = 0o170000;
/// Unix regular file type bits.
pub const S_IFREG: u32 = 0o100000;
/// Unix directory type bits.
pub const S_IFDIR: u32 = 0o040000;
/// Unix symbolic link type bits.
pub const S_IFLNK: u32 = 0o120000;

/// Permission bits mask (including setuid/setgid/sticky).
pub const PERM_MASK: u32 = 0o7777;

/// The type of a container entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// A regular file.
    Regular,
    /// A directory.
    Directory,
    /// A symbolic link; the target lives in [`EntryDescriptor::link_target`].
    Symlink,
    /// Anything else (device, fifo, socket, hard link), with its raw type bits.
    Other(u32),
}

impl FileType {
    /// Decodes the type bits of a Unix mode.
    pub fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFREG | 0 => FileType::Regular,
            S_IFDIR => FileType::Directory,
            S_IFLNK => FileType::Symlink,
            bits => FileType::Other(bits),
        }
    }

    /// Returns the Unix type bits for this file type.
    pub fn mode_bits(&self) -> u32 {
        match self {
            FileType::Regular => S_IFREG,
            FileType::Directory => S_IFDIR,
            FileType::Symlink => S_IFLNK,
            FileType::Other(bits) => *bits,
        }
    }

    /// Returns a short human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            FileType::Regular => "file",
            FileType::Directory => "directory",
            FileType::Symlink => "symlink",
            FileType::Other(_) => "special",
        }
    }
}

/// Per-entry compression method used on the zip side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntryMethod {
    /// No compression.
    Stored,
    /// Deflate compression.
    #[default]
    Deflated,
}

impl EntryMethod {
    pub(crate) fn to_zip(self) -> zip::CompressionMethod {
        match self {
            EntryMethod::Stored => zip::CompressionMethod::Stored,
            EntryMethod::Deflated => zip::CompressionMethod::Deflated,
        }
    }
}

/// Metadata of one container entry.
///
/// A descriptor only lives while its entry is being processed. For pass-through
/// entries it is written to the destination unchanged; for patched entries
/// every field is kept except `size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDescriptor {
    /// Entry path, unique within the container.
    pub path: String,
    /// Entry type.
    pub file_type: FileType,
    /// Permission bits (`0o7777` mask).
    pub perm: u32,
    /// Owner user id.
    pub uid: u32,
    /// Owner group id.
    pub gid: u32,
    /// Uncompressed data size in bytes.
    pub size: u64,
    /// Modification time.
    pub mtime: MTime,
    /// Compression method when the source is a zip container.
    pub compression: Option<EntryMethod>,
    /// Symlink target, for [`FileType::Symlink`] entries.
    pub link_target: Option<String>,
}

impl EntryDescriptor {
    /// Creates a regular-file descriptor with default metadata.
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            file_type: FileType::Regular,
            perm: 0o644,
            uid: 0,
            gid: 0,
            size,
            mtime: MTime::default(),
            compression: None,
            link_target: None,
        }
    }

    /// Creates a directory descriptor with default metadata.
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            file_type: FileType::Directory,
            perm: 0o755,
            ..Self::file(path, 0)
        }
    }

    /// Returns the full Unix mode (type bits and permission bits).
    pub fn mode(&self) -> u32 {
        self.file_type.mode_bits() | (self.perm & PERM_MASK)
    }

    /// Returns true if the entry carries a data stream worth copying.
    pub fn has_data(&self) -> bool {
        self.file_type == FileType::Regular
    }

    /// Returns a copy of this descriptor describing a replacement payload.
    ///
    /// Every field is kept except `size`.
    pub fn with_size(&self, size: u64) -> Self {
        Self {
            size,
            ..self.clone()
        }
    }
}
