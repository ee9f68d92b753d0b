//! Locating the container inside a Steam library on Unix-like systems.
//!
//! Steam originates on Windows, so directory names inside a library do not
//! have a reliable case (`SteamApps` vs `steamapps`). On Linux every path
//! component below the library root is matched ASCII case-insensitively.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{ArchiveLocator, CONTAINER_NAME, GAME_DIR, is_regular_file};
use crate::{Error, Result};

/// Steam library roots relative to `$HOME`, followed by the components
/// probed case-insensitively below them.
const LINUX_LIBRARIES: &[(&str, &[&str])] = &[
    (
        ".local/share",
        &["Steam", "SteamApps", "common", GAME_DIR, CONTAINER_NAME],
    ),
    (
        ".steam",
        &["Steam", "SteamApps", "common", GAME_DIR, CONTAINER_NAME],
    ),
];

/// Container inside the Steam library, relative to `$HOME`.
const MACOS_STEAM_ARCHIVE: &str = "Library/Application Support/Steam/SteamApps/common/Save the Dodos/Save the Dodos.app/Contents/Resources/package.nw";
/// Container inside a standalone application bundle.
const MACOS_APP_ARCHIVE: &str = "/Applications/Save the Dodos.app/Contents/Resources/package.nw";

/// Directory layout to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteamPlatform {
    /// `~/.local/share/Steam` and `~/.steam/Steam`, case-insensitive.
    Linux,
    /// `~/Library/Application Support/Steam`, then `/Applications`.
    MacOs,
}

/// Finds the container in well-known Steam locations.
#[derive(Debug, Clone)]
pub struct SteamLocator {
    home: Option<PathBuf>,
    platform: SteamPlatform,
    app_archive: PathBuf,
}

impl SteamLocator {
    /// Creates a Linux locator rooted at `home`.
    pub fn linux(home: Option<PathBuf>) -> Self {
        Self {
            home,
            platform: SteamPlatform::Linux,
            app_archive: PathBuf::from(MACOS_APP_ARCHIVE),
        }
    }

    /// Creates a macOS locator rooted at `home`.
    pub fn macos(home: Option<PathBuf>) -> Self {
        Self {
            platform: SteamPlatform::MacOs,
            ..Self::linux(home)
        }
    }

    /// Overrides the application bundle path probed on macOS.
    pub fn app_archive(mut self, path: impl Into<PathBuf>) -> Self {
        self.app_archive = path.into();
        self
    }

    /// Returns the probed layout.
    pub fn platform(&self) -> SteamPlatform {
        self.platform
    }

    fn locate_linux(&self, home: &Path) -> Option<PathBuf> {
        for (root, components) in LINUX_LIBRARIES {
            let base = home.join(root);
            match find_ignore_case(&base, components) {
                Ok(Some(path)) if is_regular_file(&path) => return Some(path),
                Ok(_) => log::debug!("No container below {}", base.display()),
                Err(e) => log::warn!("{}: {}", base.display(), e),
            }
        }
        None
    }

    fn locate_macos(&self, home: Option<&Path>) -> Option<PathBuf> {
        home.map(|home| home.join(MACOS_STEAM_ARCHIVE))
            .into_iter()
            .chain(std::iter::once(self.app_archive.clone()))
            .find(|path| {
                log::debug!("Probing {}", path.display());
                is_regular_file(path)
            })
    }
}

impl ArchiveLocator for SteamLocator {
    fn locate(&self) -> Result<PathBuf> {
        let home = self.home.as_deref();
        let found = match self.platform {
            SteamPlatform::Linux => {
                let home = home.ok_or_else(|| Error::Locate {
                    reason: "HOME is not set".into(),
                })?;
                self.locate_linux(home)
            }
            SteamPlatform::MacOs => self.locate_macos(home),
        };

        found.ok_or_else(|| Error::Locate {
            reason: format!("no {} found in any Steam library", CONTAINER_NAME),
        })
    }
}

/// Walks `components` below `base`, matching each name ASCII
/// case-insensitively.
///
/// An exact match wins over a case-folded one. Returns `Ok(None)` when a
/// component has no match.
pub fn find_ignore_case(base: &Path, components: &[&str]) -> io::Result<Option<PathBuf>> {
    let mut current = base.to_path_buf();

    for component in components {
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut found = None;
        for entry in entries {
            let name = entry?.file_name();
            let Some(text) = name.to_str() else { continue };
            if !text.eq_ignore_ascii_case(component) {
                continue;
            }
            if text == *component {
                found = Some(name);
                break;
            }
            if found.is_none() {
                found = Some(name);
            }
        }

        match found {
            Some(name) => current.push(name),
            None => return Ok(None),
        }
    }

    Ok(Some(current))
}
