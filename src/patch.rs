//! The patch table: replacement payloads keyed by entry path.
//!
//! The table is built once before a transaction starts and is read-only
//! afterwards. Lookup is exact string match, with no globbing or case folding.
//!
//! # Example
//!
//! ```rust
//! use nwpatch::PatchTable;
//!
//! let mut table = PatchTable::new();
//! table.insert("img/atlas0.png", b"BB".to_vec());
//!
//! assert_eq!(table.get("img/atlas0.png").unwrap().payload_len(), 2);
//! assert!(table.get("IMG/atlas0.png").is_none());
//! ```

use std::collections::HashMap;
use std::io;
use std::path::Path;

use crate::{Error, Result};

/// Entry paths the bundled payload set replaces.
pub const DEFAULT_TARGETS: &[&str] = &["img/atlas0.png", "img/atlas1.png", "img/atlas2.png"];

/// A single replacement: target entry path plus payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchEntry {
    target_path: String,
    payload: Box<[u8]>,
}

impl PatchEntry {
    /// Creates a patch entry.
    pub fn new(target_path: impl Into<String>, payload: impl Into<Box<[u8]>>) -> Self {
        Self {
            target_path: target_path.into(),
            payload: payload.into(),
        }
    }

    /// Returns the entry path this payload replaces.
    pub fn target_path(&self) -> &str {
        &self.target_path
    }

    /// Returns the replacement bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the payload length in bytes.
    pub fn payload_len(&self) -> u64 {
        self.payload.len() as u64
    }
}

/// Mapping from entry path to replacement payload.
#[derive(Debug, Clone, Default)]
pub struct PatchTable {
    entries: HashMap<String, PatchEntry>,
}

impl PatchTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a payload for `target_path`, returning the one it replaced.
    pub fn insert(
        &mut self,
        target_path: impl Into<String>,
        payload: impl Into<Box<[u8]>>,
    ) -> Option<PatchEntry> {
        let entry = PatchEntry::new(target_path, payload);
        self.entries.insert(entry.target_path.clone(), entry)
    }

    /// Looks up the payload for an entry path (exact match).
    pub fn get(&self, path: &str) -> Option<&PatchEntry> {
        self.entries.get(path)
    }

    /// Returns the number of payloads.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table holds no payloads.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the target paths in sorted order.
    pub fn targets(&self) -> Vec<&str> {
        let mut targets: Vec<_> = self.entries.keys().map(String::as_str).collect();
        targets.sort_unstable();
        targets
    }

    /// Loads one payload per target from `dir`.
    ///
    /// Each target's `/`-separated path is resolved relative to `dir`. A
    /// missing payload is an error; the table is never partially built.
    pub fn load_targets(dir: impl AsRef<Path>, targets: &[&str]) -> Result<Self> {
        let dir = dir.as_ref();
        let mut table = Self::new();

        for target in targets {
            let file = target
                .split('/')
                .fold(dir.to_path_buf(), |path, component| path.join(component));
            let payload = std::fs::read(&file).map_err(|e| {
                Error::Io(io::Error::new(
                    e.kind(),
                    format!("{}: {}", file.display(), e),
                ))
            })?;
            log::debug!("Loaded payload {} ({} bytes)", target, payload.len());
            table.insert(*target, payload);
        }

        Ok(table)
    }
}

impl<P: Into<String>, D: Into<Box<[u8]>>> FromIterator<(P, D)> for PatchTable {
    fn from_iter<I: IntoIterator<Item = (P, D)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (path, payload) in iter {
            table.insert(path, payload);
        }
        table
    }
}
