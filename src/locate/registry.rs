//! Locating the container through the Windows registry.
//!
//! Steam records its install directory under several keys depending on
//! installer version and bitness. Every combination is tried in order.

use std::io;
use std::path::{Path, PathBuf};

use winreg::RegKey;
use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_QUERY_VALUE};

use super::{ArchiveLocator, CONTAINER_NAME, GAME_DIR, is_regular_file};
use crate::{Error, Result};

/// Registry hive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hive {
    /// `HKEY_LOCAL_MACHINE`.
    LocalMachine,
    /// `HKEY_CURRENT_USER`.
    CurrentUser,
}

impl Hive {
    fn open(self) -> RegKey {
        match self {
            Hive::LocalMachine => RegKey::predef(HKEY_LOCAL_MACHINE),
            Hive::CurrentUser => RegKey::predef(HKEY_CURRENT_USER),
        }
    }
}

/// Registry values known to hold the Steam install path, most common first.
pub const STEAM_KEYS: &[(Hive, &str, &str)] = &[
    (Hive::LocalMachine, r"Software\Valve\Steam", "InstallPath"),
    (Hive::LocalMachine, r"Software\Wow6432node\Valve\Steam", "InstallPath"),
    (Hive::CurrentUser, r"Software\Valve\Steam", "SteamPath"),
    (Hive::CurrentUser, r"Software\Wow6432node\Valve\Steam", "SteamPath"),
    (Hive::LocalMachine, r"Software\Valve\Steam", "SteamPath"),
    (Hive::LocalMachine, r"Software\Wow6432node\Valve\Steam", "SteamPath"),
    (Hive::CurrentUser, r"Software\Valve\Steam", "InstallPath"),
    (Hive::CurrentUser, r"Software\Wow6432node\Valve\Steam", "InstallPath"),
];

/// Finds the container below the Steam install directory.
#[derive(Debug, Clone, Default)]
pub struct RegistryLocator;

impl RegistryLocator {
    /// Creates a registry locator.
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveLocator for RegistryLocator {
    fn locate(&self) -> Result<PathBuf> {
        for (hive, subkey, value) in STEAM_KEYS {
            let install = match query_string(*hive, subkey, value) {
                Ok(install) => install,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    log::warn!("{:?}\\{}\\{}: {}", hive, subkey, value, e);
                    continue;
                }
            };

            let path = container_under(Path::new(&install));
            log::debug!("Probing {}", path.display());
            if is_regular_file(&path) {
                return Ok(path);
            }
        }

        Err(Error::Locate {
            reason: format!("no Steam install with {} found in the registry", CONTAINER_NAME),
        })
    }
}

fn query_string(hive: Hive, subkey: &str, value: &str) -> io::Result<String> {
    hive.open()
        .open_subkey_with_flags(subkey, KEY_QUERY_VALUE)?
        .get_value(value)
}

/// Returns the container path inside a Steam install directory.
pub fn container_under(install: &Path) -> PathBuf {
    install
        .join("steamapps")
        .join("common")
        .join(GAME_DIR)
        .join(CONTAINER_NAME)
}
