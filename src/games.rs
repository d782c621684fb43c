//! Supported games and their installation layout
//!
//! Each game knows where it usually lives, how to recognise a valid
//! installation root, where its remote catalogs are published and which
//! modding framework it needs.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Artifact, ModError, Result};
use crate::installers::extract_archive;
use crate::logging::{log_download, log_install, log_warning};
use crate::remote::Transfer;

/// GitHub raw URL base for the published catalogs
const CATALOG_RAW_URL: &str = "https://raw.githubusercontent.com/BrandenEK/Blasphemous-Mod-Installer/main";

/// Directory under the game root that holds every non-framework mod
pub const MODDING_DIR: &str = "Modding";

/// MelonLoader major version current Blasphemous 2 mods are built against
const MELONLOADER_MAJOR: u16 = 2;

/// `dwSignature` of a `VS_FIXEDFILEINFO` block, little endian
const FIXED_FILE_INFO_SIGNATURE: [u8; 4] = [0xBD, 0x04, 0xEF, 0xFE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Game {
    Blasphemous,
    Blasphemous2,
}

impl Game {
    pub const ALL: [Game; 2] = [Game::Blasphemous, Game::Blasphemous2];

    pub fn display_name(&self) -> &'static str {
        match self {
            Game::Blasphemous => "Blasphemous",
            Game::Blasphemous2 => "Blasphemous 2",
        }
    }

    /// Short key used for cache file names and the command line
    pub fn key(&self) -> &'static str {
        match self {
            Game::Blasphemous => "blas1",
            Game::Blasphemous2 => "blas2",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.key() == key)
    }

    pub fn exe_name(&self) -> &'static str {
        match self {
            Game::Blasphemous => "Blasphemous.exe",
            Game::Blasphemous2 => "Blasphemous 2.exe",
        }
    }

    /// Default Steam library location (relative to the Steam root)
    pub fn default_steam_dir(&self) -> &'static str {
        match self {
            Game::Blasphemous => "steamapps/common/Blasphemous",
            Game::Blasphemous2 => "steamapps/common/Blasphemous 2",
        }
    }

    /// Best guess at the installation root when the user has not set one
    pub fn guess_root(&self) -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        [".steam/steam", ".local/share/Steam"]
            .iter()
            .map(|steam| home.join(steam).join(self.default_steam_dir()))
            .find(|candidate| candidate.join(self.exe_name()).exists())
    }

    /// Name of the catalog mod that installs into the game root itself
    /// instead of the `Modding` directory
    pub fn framework_mod(&self) -> Option<&'static str> {
        match self {
            Game::Blasphemous => Some("Modding API"),
            Game::Blasphemous2 => None,
        }
    }

    pub fn mods_catalog_url(&self) -> String {
        match self {
            Game::Blasphemous => format!("{}/blas1mods.json", CATALOG_RAW_URL),
            Game::Blasphemous2 => format!("{}/blas2mods.json", CATALOG_RAW_URL),
        }
    }

    pub fn skins_catalog_url(&self) -> Option<String> {
        match self {
            Game::Blasphemous => Some(format!("{}/blas1skins.json", CATALOG_RAW_URL)),
            Game::Blasphemous2 => None,
        }
    }

    /// Archive with the game's modding tools, extracted straight into the root
    pub fn modding_tools_url(&self) -> Option<&'static str> {
        match self {
            Game::Blasphemous => None,
            Game::Blasphemous2 => {
                Some("https://github.com/BrandenEK/BlasII.ModdingTools/raw/main/modding-tools.zip")
            }
        }
    }

    /// A root is valid when the game executable is present.
    ///
    /// Creates `Modding/disabled` on success so disabling a mod never
    /// has to create it.
    pub fn is_root_valid(&self, root: &Path) -> bool {
        if !root.join(self.exe_name()).is_file() {
            return false;
        }

        let disabled = root.join(MODDING_DIR).join("disabled");
        if let Err(e) = fs::create_dir_all(&disabled) {
            log_warning(&format!(
                "Could not create {}: {}",
                disabled.display(),
                e
            ));
        }
        true
    }

    pub fn modding_tools_installed(&self, root: &Path) -> bool {
        match self {
            Game::Blasphemous => root.join(MODDING_DIR).is_dir(),
            Game::Blasphemous2 => root.join("MelonLoader").is_dir(),
        }
    }

    /// True when the tools are installed but older than what current mods need.
    ///
    /// Blasphemous 2 requires MelonLoader 2.x; a loader whose version cannot
    /// be read counts as outdated.
    pub fn modding_tools_outdated(&self, root: &Path) -> bool {
        match self {
            Game::Blasphemous => false,
            Game::Blasphemous2 => {
                let loader = root.join("MelonLoader").join("net6").join("MelonLoader.dll");
                self.modding_tools_installed(root)
                    && file_major_version(&loader) != Some(MELONLOADER_MAJOR)
            }
        }
    }

    /// Download the modding tools archive and extract it over `root`.
    ///
    /// Returns false for games that ship no separate tools.
    pub fn install_modding_tools(
        &self,
        root: &Path,
        transfer: &dyn Transfer,
        downloads: &Path,
        progress: &dyn Fn(f32),
    ) -> Result<bool> {
        let Some(url) = self.modding_tools_url() else {
            return Ok(false);
        };

        let archive = downloads.join(format!("{}_modding_tools.zip", self.key()));
        log_download(&format!("Downloading {} modding tools", self));
        transfer.download(url, &archive, progress)?;

        let extracted = extract_archive(&archive, root)
            .map_err(|e| ModError::install("Modding tools", Artifact::Archive, e));
        if let Err(e) = fs::remove_file(&archive) {
            log_warning(&format!("Could not remove {}: {}", archive.display(), e));
        }
        log_install(&format!(
            "Installed {} modding tools ({} files)",
            self,
            extracted?
        ));
        Ok(true)
    }
}

/// Major file version from a Windows binary's version resource
fn file_major_version(path: &Path) -> Option<u16> {
    let bytes = fs::read(path).ok()?;
    let start = bytes
        .windows(FIXED_FILE_INFO_SIGNATURE.len())
        .position(|w| w == FIXED_FILE_INFO_SIGNATURE)?;
    // dwSignature, dwStrucVersion, then dwFileVersionMS whose high word is the major part
    let ms = bytes.get(start + 8..start + 12)?;
    Some(u16::from_le_bytes([ms[2], ms[3]]))
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
