//! Resolving the container path.
//!
//! The orchestrator only depends on [`ArchiveLocator`]. Platform strategies
//! live in submodules and [`default_locator`] picks the one matching the
//! build target:
//!
//! | Platform | Strategy |
//! |----------|----------|
//! | Windows | [`RegistryLocator`](registry::RegistryLocator): Steam install path from the registry |
//! | macOS | [`SteamLocator::macos`]: Steam library and `/Applications` bundle |
//! | other | [`SteamLocator::linux`]: case-insensitive probe of the Steam library |

use std::path::{Path, PathBuf};

use crate::{Error, Result};

#[cfg(windows)]
pub mod registry;
pub mod steam;

pub use steam::{SteamLocator, SteamPlatform};

#[cfg(windows)]
pub use registry::RegistryLocator;

/// File name of the container inside the game directory.
pub const CONTAINER_NAME: &str = "package.nw";
/// Game directory name inside a Steam library.
pub const GAME_DIR: &str = "Save the Dodos";

/// Resolves the path of an existing container file.
pub trait ArchiveLocator {
    /// Returns the container path, or [`Error::Locate`] if none was found.
    fn locate(&self) -> Result<PathBuf>;
}

impl<L: ArchiveLocator + ?Sized> ArchiveLocator for Box<L> {
    fn locate(&self) -> Result<PathBuf> {
        (**self).locate()
    }
}

/// A locator for a path known up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedLocator {
    path: PathBuf,
}

impl FixedLocator {
    /// Creates a locator returning `path` if it is a regular file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ArchiveLocator for FixedLocator {
    fn locate(&self) -> Result<PathBuf> {
        if is_regular_file(&self.path) {
            Ok(self.path.clone())
        } else {
            Err(Error::Locate {
                reason: format!("{} is not a regular file", self.path.display()),
            })
        }
    }
}

/// Returns the locator for the build target.
#[cfg(windows)]
pub fn default_locator() -> Box<dyn ArchiveLocator> {
    Box::new(RegistryLocator::new())
}

/// Returns the locator for the build target.
#[cfg(target_os = "macos")]
pub fn default_locator() -> Box<dyn ArchiveLocator> {
    Box::new(SteamLocator::macos(home_dir()))
}

/// Returns the locator for the build target.
#[cfg(not(any(windows, target_os = "macos")))]
pub fn default_locator() -> Box<dyn ArchiveLocator> {
    Box::new(SteamLocator::linux(home_dir()))
}

/// Returns `$HOME`, if set.
#[cfg(not(windows))]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

/// Returns true if `path` exists and is a regular file (following symlinks).
pub(crate) fn is_regular_file(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file(),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("{}: {}", path.display(), e);
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fixed_locator_accepts_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONTAINER_NAME);
        std::fs::write(&path, b"x").unwrap();
        assert_eq!(FixedLocator::new(&path).locate().unwrap(), path);
    }

    #[test]
    fn test_fixed_locator_rejects_missing_and_directories() {
        let dir = TempDir::new().unwrap();
        let missing = FixedLocator::new(dir.path().join(CONTAINER_NAME));
        assert!(matches!(missing.locate(), Err(Error::Locate { .. })));

        let directory = FixedLocator::new(dir.path());
        assert!(matches!(directory.locate(), Err(Error::Locate { .. })));
    }

    #[test]
    fn test_boxed_locator() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONTAINER_NAME);
        std::fs::write(&path, b"x").unwrap();
        let boxed: Box<dyn ArchiveLocator> = Box::new(FixedLocator::new(&path));
        assert_eq!(boxed.locate().unwrap(), path);
    }
}
