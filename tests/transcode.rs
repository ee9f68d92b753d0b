//! Transcoder integration tests.
//!
//! Every test builds a source container on disk, runs [`Transcoder::run`]
//! into a fresh zip, and reads the result back.

use std::fs;
use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::path::PathBuf;

use nwpatch::progress::{NoProgress, StatisticsProgress};
use nwpatch::{
    EntryMethod, Error, FileType, MTime, PatchTable, SourceArchive, Transcoder, ZipSink,
};
use tempfile::TempDir;

mod common;
use common::{
    ORIGINAL_ATLAS, PATCHED_ATLAS, TarEntry, comparable, entry_names, gzip, read_entries,
    tar_bytes, zip_bytes, zip_bytes_with,
};

fn atlas_table() -> PatchTable {
    [("img/atlas0.png", PATCHED_ATLAS.to_vec())]
        .into_iter()
        .collect()
}

/// Writes `bytes` as the source container and returns (dir, source, dest).
fn setup(bytes: &[u8]) -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("package.nw.backup");
    let dest = dir.path().join("package.nw");
    fs::write(&source, bytes).unwrap();
    (dir, source, dest)
}

// =============================================================================
// Reference scenario
// =============================================================================

#[test]
fn test_single_atlas_replaced() {
    let (_dir, source, dest) = setup(&tar_bytes(&[TarEntry::file(
        "img/atlas0.png",
        ORIGINAL_ATLAS,
    )]));

    let result = Transcoder::new(&atlas_table())
        .run(&source, &dest, &mut NoProgress)
        .unwrap();
    assert_eq!(result.entries_replaced, 1);
    assert_eq!(result.entries_copied, 0);

    let entries = read_entries(&dest);
    assert_eq!(entries.len(), 1);
    let (desc, data) = &entries[0];
    assert_eq!(desc.path, "img/atlas0.png");
    assert_eq!(data, PATCHED_ATLAS);
    assert_eq!(desc.size, 2);
    assert_eq!(desc.perm, 0o644);
    assert_eq!(desc.mtime, MTime::new(1000, 0));
}

// =============================================================================
// Order, count, fidelity
// =============================================================================

#[test]
fn test_entry_count_and_order_preserved() {
    let names = [
        "index.html",
        "img/atlas2.png",
        "js/game.js",
        "img/atlas0.png",
        "img/atlas1.png",
        "package.json",
    ];
    let entries: Vec<(&str, &[u8])> = names.iter().map(|n| (*n, n.as_bytes())).collect();
    let (_dir, source, dest) = setup(&zip_bytes(&entries));

    let table: PatchTable = [
        ("img/atlas0.png", b"zero".to_vec()),
        ("img/atlas1.png", b"one".to_vec()),
        ("img/atlas2.png", b"two".to_vec()),
    ]
    .into_iter()
    .collect();

    let result = Transcoder::new(&table)
        .run(&source, &dest, &mut NoProgress)
        .unwrap();
    assert_eq!(result.total_entries(), names.len());
    assert_eq!(result.entries_replaced, 3);
    assert_eq!(entry_names(&dest), names);
}

#[test]
fn test_patched_entry_keeps_metadata() {
    let mut atlas = TarEntry::file("img/atlas0.png", ORIGINAL_ATLAS);
    atlas.mode = 0o600;
    atlas.mtime = 1_500_000_000;
    atlas.uid = 4242;
    atlas.gid = 77;
    let (_dir, source, dest) = setup(&tar_bytes(&[
        TarEntry::file("index.html", b"<html>"),
        atlas,
    ]));

    let before = read_entries(&source);
    Transcoder::new(&atlas_table())
        .run(&source, &dest, &mut NoProgress)
        .unwrap();
    let after = read_entries(&dest);

    let (src, _) = &before[1];
    let (out, data) = &after[1];
    assert_eq!(data, PATCHED_ATLAS);
    assert_eq!(out.size, PATCHED_ATLAS.len() as u64);
    assert_eq!(out.file_type, src.file_type);
    assert_eq!(out.perm, 0o600);
    assert_eq!(out.mode(), src.mode());
    assert_eq!(out.uid, 4242);
    assert_eq!(out.gid, 77);
    assert_eq!(out.mtime, src.mtime);
}

#[test]
fn test_pass_through_from_tar_is_identical() {
    let mut script = TarEntry::file("bin/run.sh", b"#!/bin/sh\necho hi\n");
    script.mode = 0o755;
    script.mtime = 1_234_567_890;
    let (_dir, source, dest) = setup(&tar_bytes(&[
        TarEntry::file("img/atlas0.png", ORIGINAL_ATLAS),
        script,
        TarEntry::symlink("bin/latest", "run.sh"),
    ]));

    let before = read_entries(&source);
    Transcoder::new(&atlas_table())
        .run(&source, &dest, &mut NoProgress)
        .unwrap();
    let after = read_entries(&dest);

    assert_eq!(after.len(), before.len());
    for ((src, src_data), (out, out_data)) in before.iter().zip(&after).skip(1) {
        assert_eq!(comparable(out), comparable(src), "metadata of {}", src.path);
        assert_eq!(out_data, src_data, "data of {}", src.path);
    }
    assert_eq!(after[2].0.file_type, FileType::Symlink);
    assert_eq!(after[2].0.link_target.as_deref(), Some("run.sh"));
}

#[test]
fn test_pax_records_override_header() {
    let atlas = TarEntry::file("img/atlas0.png", ORIGINAL_ATLAS)
        .with_pax("mtime", "1000.5")
        .with_pax("uid", "5000000")
        .with_pax("gid", "42");
    let (_dir, source, dest) = setup(&tar_bytes(&[
        atlas,
        TarEntry::file("readme.txt", b"dodos").with_pax("mtime", "2000.123456789"),
    ]));

    let before = read_entries(&source);
    assert_eq!(before[0].0.mtime, MTime::new(1000, 500_000_000));
    assert_eq!(before[0].0.uid, 5_000_000);
    assert_eq!(before[0].0.gid, 42);

    Transcoder::new(&atlas_table())
        .run(&source, &dest, &mut NoProgress)
        .unwrap();
    let after = read_entries(&dest);

    // Patched entries keep the precise time too
    assert_eq!(after[0].0.mtime, MTime::new(1000, 500_000_000));
    assert_eq!(after[0].0.uid, 5_000_000);
    assert_eq!(after[0].0.gid, 42);
    // The zip NTFS field stores 100ns units
    assert_eq!(after[1].0.mtime, MTime::new(2000, 123_456_700));
    assert_eq!(after[1].0.uid, 1000);
}

#[test]
fn test_special_permission_bits_dropped() {
    let mut script = TarEntry::file("bin/run.sh", b"#!/bin/sh\n");
    script.mode = 0o4755;
    let (_dir, source, dest) = setup(&tar_bytes(&[script]));

    assert_eq!(read_entries(&source)[0].0.perm, 0o4755);
    Transcoder::new(&PatchTable::new())
        .run(&source, &dest, &mut NoProgress)
        .unwrap();
    assert_eq!(read_entries(&dest)[0].0.perm, 0o755);
}

#[test]
fn test_pass_through_from_zip_is_identical() {
    let payload: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
    let (_dir, source, dest) = setup(&zip_bytes(&[
        ("img/", b""),
        ("img/atlas0.png", ORIGINAL_ATLAS),
        ("data/blob.bin", &payload),
    ]));

    let before = read_entries(&source);
    let result = Transcoder::new(&atlas_table())
        .run(&source, &dest, &mut NoProgress)
        .unwrap();
    let after = read_entries(&dest);

    assert_eq!(result.largest_entry, payload.len() as u64);
    assert_eq!(after[0], before[0]);
    assert_eq!(after[2], before[2]);
    assert_eq!(after[2].1, payload);
}

#[test]
fn test_zip_entry_methods_kept() {
    let (_dir, source, dest) = setup(&zip_bytes_with(
        &[("a.txt", b"stored data")],
        zip::CompressionMethod::Stored,
    ));

    Transcoder::new(&PatchTable::new())
        .run(&source, &dest, &mut NoProgress)
        .unwrap();
    let after = read_entries(&dest);
    assert_eq!(after[0].0.compression, Some(EntryMethod::Stored));
}

#[test]
fn test_default_method_applies_to_tar_sources() {
    let (_dir, source, dest) = setup(&tar_bytes(&[TarEntry::file("a.txt", b"abc")]));

    Transcoder::new(&PatchTable::new())
        .default_method(EntryMethod::Stored)
        .run(&source, &dest, &mut NoProgress)
        .unwrap();
    let after = read_entries(&dest);
    assert_eq!(after[0].0.compression, Some(EntryMethod::Stored));
}

// =============================================================================
// Empty containers
// =============================================================================

#[test]
fn test_empty_zip() {
    let (_dir, source, dest) = setup(&zip_bytes(&[]));
    let result = Transcoder::new(&atlas_table())
        .run(&source, &dest, &mut NoProgress)
        .unwrap();
    assert_eq!(result.total_entries(), 0);
    assert!(read_entries(&dest).is_empty());
}

#[test]
fn test_empty_tar() {
    let (_dir, source, dest) = setup(&tar_bytes(&[]));
    let result = Transcoder::new(&atlas_table())
        .run(&source, &dest, &mut NoProgress)
        .unwrap();
    assert_eq!(result.total_entries(), 0);
    assert!(read_entries(&dest).is_empty());
}

// =============================================================================
// Compressed sources
// =============================================================================

fn assert_compressed_source(bytes: Vec<u8>) {
    let (_dir, source, dest) = setup(&bytes);
    let mut stats = StatisticsProgress::new();
    Transcoder::new(&atlas_table())
        .run(&source, &dest, &mut stats)
        .unwrap();

    assert_eq!(stats.entries_replaced(), 1);
    assert_eq!(stats.entries_copied(), 1);
    let entries = read_entries(&dest);
    assert_eq!(entries[0].1, PATCHED_ATLAS);
    assert_eq!(entries[1].1, b"{\"name\":\"dodos\"}");
}

fn fixture_tar() -> Vec<u8> {
    tar_bytes(&[
        TarEntry::file("img/atlas0.png", ORIGINAL_ATLAS),
        TarEntry::file("package.json", b"{\"name\":\"dodos\"}"),
    ])
}

#[cfg(feature = "gzip")]
#[test]
fn test_gzip_tar_source() {
    assert_compressed_source(gzip(&fixture_tar()));
}

#[cfg(feature = "bzip2")]
#[test]
fn test_bzip2_tar_source() {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(&fixture_tar()).unwrap();
    assert_compressed_source(encoder.finish().unwrap());
}

#[cfg(feature = "zstd")]
#[test]
fn test_zstd_tar_source() {
    assert_compressed_source(zstd::encode_all(fixture_tar().as_slice(), 3).unwrap());
}

#[test]
fn test_xz_source_is_open_error() {
    let (_dir, source, dest) = setup(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, 0, 0]);
    let err = Transcoder::new(&atlas_table())
        .run(&source, &dest, &mut NoProgress)
        .unwrap_err();
    match err {
        Error::Open { reason, .. } => assert!(reason.contains("XZ")),
        e => panic!("Expected Open error, got: {:?}", e),
    }
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_corrupt_entry_is_data_error() {
    let mut bytes = zip_bytes_with(
        &[("a.txt", b"first"), ("b.txt", b"hello world")],
        zip::CompressionMethod::Stored,
    );
    let pos = bytes
        .windows(11)
        .position(|w| w == b"hello world")
        .unwrap();
    bytes[pos] = b'j';
    let (_dir, source, dest) = setup(&bytes);

    let err = Transcoder::new(&PatchTable::new())
        .run(&source, &dest, &mut NoProgress)
        .unwrap_err();
    assert!(matches!(err, Error::Data { .. }), "got {:?}", err);
    assert_eq!(err.entry_path(), Some("b.txt"));
}

#[test]
fn test_patching_directory_is_header_error() {
    let (_dir, source, dest) = setup(&zip_bytes(&[("img/", b"")]));
    let table: PatchTable = [("img/", b"x".to_vec())].into_iter().collect();

    let err = Transcoder::new(&table)
        .run(&source, &dest, &mut NoProgress)
        .unwrap_err();
    assert!(matches!(err, Error::Header { .. }));
}

#[test]
fn test_truncated_tar_is_error() {
    let mut bytes = tar_bytes(&[TarEntry::file("big.bin", &[7u8; 4096])]);
    bytes.truncate(512 + 1000);
    let (_dir, source, dest) = setup(&bytes);

    let err = Transcoder::new(&PatchTable::new())
        .run(&source, &dest, &mut NoProgress)
        .unwrap_err();
    assert!(matches!(err, Error::Data { .. } | Error::Header { .. }));
}

/// A writer that fails once `budget` bytes have been written.
struct FailingWriter {
    inner: Cursor<Vec<u8>>,
    budget: usize,
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.budget == 0 {
            return Err(io::Error::other("disk full"));
        }
        let n = buf.len().min(self.budget);
        self.budget -= n;
        self.inner.write(&buf[..n])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for FailingWriter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

#[test]
fn test_write_failure_aborts() {
    let noise: Vec<u8> = (0..100_000u32)
        .map(|i| (i.wrapping_mul(2_654_435_761) >> 24) as u8)
        .collect();
    let (_dir, source, _dest) = setup(&tar_bytes(&[TarEntry::file("noise.bin", &noise)]));

    let mut archive = SourceArchive::open(&source).unwrap();
    let mut sink = ZipSink::new(FailingWriter {
        inner: Cursor::new(Vec::new()),
        budget: 1024,
    })
    .default_method(EntryMethod::Stored);

    let err = Transcoder::new(&PatchTable::new())
        .transcode(&mut archive, &mut sink, &mut NoProgress)
        .unwrap_err();
    assert!(
        matches!(err, Error::Data { .. } | Error::Header { .. }),
        "got {:?}",
        err
    );
}
