//! Container format detection.
//!
//! The source container's outer compression filter and its container format
//! are identified from magic bytes, never from the file name. A compression
//! filter always wraps a tar stream: zip containers cannot be read through a
//! non-seekable decoder.

use std::io::{self, Read, Seek, SeekFrom};

/// Outer compression filter applied to the whole container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    /// No outer filter.
    None,
    /// gzip stream.
    Gzip,
    /// bzip2 stream.
    Bzip2,
    /// Zstandard stream.
    Zstd,
    /// XZ stream.
    Xz,
}

impl Filter {
    /// Returns a human-readable name for this filter.
    pub fn name(&self) -> &'static str {
        match self {
            Filter::None => "none",
            Filter::Gzip => "gzip",
            Filter::Bzip2 => "bzip2",
            Filter::Zstd => "Zstandard",
            Filter::Xz => "XZ",
        }
    }

    /// Returns whether this build can decode the filter.
    pub fn is_supported(&self) -> bool {
        match self {
            Filter::None => true,
            Filter::Gzip => cfg!(feature = "gzip"),
            Filter::Bzip2 => cfg!(feature = "bzip2"),
            Filter::Zstd => cfg!(feature = "zstd"),
            Filter::Xz => false,
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Container format inside the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    /// ZIP archive.
    Zip,
    /// TAR archive.
    Tar,
}

impl ContainerFormat {
    /// Returns a human-readable name for this format.
    pub fn name(&self) -> &'static str {
        match self {
            ContainerFormat::Zip => "ZIP",
            ContainerFormat::Tar => "TAR",
        }
    }
}

impl std::fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detection result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detected {
    /// Outer compression filter.
    pub filter: Filter,
    /// Container format, `None` if unrecognized.
    pub format: Option<ContainerFormat>,
}

impl Detected {
    fn new(filter: Filter, format: Option<ContainerFormat>) -> Self {
        Self { filter, format }
    }
}

/// Known signatures at offset 0.
const SIGNATURES: &[(&[u8], Filter, ContainerFormat)] = &[
    // ZIP: 'P' 'K' 0x03 0x04 (local file header)
    (&[0x50, 0x4B, 0x03, 0x04], Filter::None, ContainerFormat::Zip),
    // ZIP: 'P' 'K' 0x05 0x06 (empty archive)
    (&[0x50, 0x4B, 0x05, 0x06], Filter::None, ContainerFormat::Zip),
    // gzip: 0x1F 0x8B
    (&[0x1F, 0x8B], Filter::Gzip, ContainerFormat::Tar),
    // bzip2: 'B' 'Z' 'h'
    (&[0x42, 0x5A, 0x68], Filter::Bzip2, ContainerFormat::Tar),
    // Zstd: 0x28 0xB5 0x2F 0xFD
    (&[0x28, 0xB5, 0x2F, 0xFD], Filter::Zstd, ContainerFormat::Tar),
    // XZ: 0xFD '7' 'z' 'X' 'Z' 0x00
    (&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00], Filter::Xz, ContainerFormat::Tar),
];

/// TAR USTAR signature at offset 257.
const TAR_USTAR_SIGNATURE: &[u8] = b"ustar";
const TAR_USTAR_OFFSET: usize = 257;

/// Size of one tar block; an empty tar archive is at least two of these.
const TAR_BLOCK: usize = 512;

/// Detects the filter and container format of a reader.
///
/// The reader position is restored before returning.
pub fn detect_format<R: Read + Seek>(reader: &mut R) -> io::Result<Detected> {
    let start_pos = reader.stream_position()?;

    let mut header = Vec::with_capacity(TAR_BLOCK);
    reader.by_ref().take(TAR_BLOCK as u64).read_to_end(&mut header)?;
    reader.seek(SeekFrom::Start(start_pos))?;

    for (signature, filter, format) in SIGNATURES {
        if header.starts_with(signature) {
            return Ok(Detected::new(*filter, Some(*format)));
        }
    }

    if header.len() >= TAR_USTAR_OFFSET + TAR_USTAR_SIGNATURE.len()
        && &header[TAR_USTAR_OFFSET..TAR_USTAR_OFFSET + TAR_USTAR_SIGNATURE.len()]
            == TAR_USTAR_SIGNATURE
    {
        return Ok(Detected::new(Filter::None, Some(ContainerFormat::Tar)));
    }

    // An empty tar archive is nothing but zero blocks
    if header.len() == TAR_BLOCK && header.iter().all(|&b| b == 0) {
        return Ok(Detected::new(Filter::None, Some(ContainerFormat::Tar)));
    }

    Ok(Detected::new(Filter::None, None))
}
