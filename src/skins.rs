//! Cosmetic skins for Blasphemous
//!
//! A skin is two files in `Modding/skins/<id>/`. It is installed exactly when
//! that folder exists; there is no enabled/disabled distinction.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogStore;
use crate::error::{Artifact, ModError, Result};
use crate::installers::{is_path_segment, ModLayout};
use crate::logging::{log_action, log_download, log_info, log_install, log_warning};
use crate::manager::ModLocks;
use crate::remote::Transfer;
use crate::version::is_newer;

/// Where skin files are published when the catalog entry omits explicit URLs
const SKINS_RAW_URL: &str = "https://raw.githubusercontent.com/BrandenEK/Blasphemous-Custom-Skins/main";

const INFO_FILE: &str = "info.txt";
const TEXTURE_FILE: &str = "texture.png";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkinRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub author: String,
    pub version: String,
    #[serde(default)]
    pub info_url: Option<String>,
    #[serde(default)]
    pub texture_url: Option<String>,
    #[serde(default)]
    pub idle_preview_url: Option<String>,
    #[serde(default)]
    pub charged_preview_url: Option<String>,
}

impl SkinRecord {
    fn published(&self, explicit: &Option<String>, file: &str) -> String {
        explicit
            .clone()
            .unwrap_or_else(|| format!("{}/{}/{}", SKINS_RAW_URL, self.id, file))
    }

    pub fn info_url(&self) -> String {
        self.published(&self.info_url, INFO_FILE)
    }

    pub fn texture_url(&self) -> String {
        self.published(&self.texture_url, TEXTURE_FILE)
    }

    pub fn idle_preview_url(&self) -> String {
        self.published(&self.idle_preview_url, "idle.png")
    }

    pub fn charged_preview_url(&self) -> String {
        self.published(&self.charged_preview_url, "charged.png")
    }
}

/// Subset of an installed `info.txt` we care about
#[derive(Deserialize)]
struct InstalledInfo {
    version: String,
}

/// One row of `skins list`
#[derive(Debug, Clone)]
pub struct SkinStatus {
    pub skin: SkinRecord,
    pub installed: bool,
    pub update_available: bool,
}

pub struct SkinManager {
    skins_dir: PathBuf,
    downloads: PathBuf,
    store: CatalogStore,
    transfer: Arc<dyn Transfer>,
    skins: Mutex<Vec<SkinRecord>>,
    locks: ModLocks,
}

impl SkinManager {
    pub fn new(
        layout: &ModLayout,
        store: CatalogStore,
        transfer: Arc<dyn Transfer>,
        downloads: PathBuf,
    ) -> Result<Self> {
        let skins = store.load()?;
        Ok(Self {
            skins_dir: layout.skins_dir(),
            downloads,
            store,
            transfer,
            skins: Mutex::new(skins),
            locks: ModLocks::new(),
        })
    }

    #[cfg(feature = "net")]
    pub fn open(config: &crate::config::AppConfig) -> Result<Self> {
        use crate::config::AppConfig;
        use crate::games::Game;

        let game = Game::Blasphemous;
        let root = config.require_root(game)?;
        Self::new(
            &ModLayout::for_game(game, root),
            CatalogStore::new(AppConfig::get_skins_catalog_path(game)),
            Arc::new(crate::utils::HttpTransfer::new(config.request_timeout())),
            AppConfig::get_downloads_path(),
        )
    }

    pub fn skin_folder(&self, id: &str) -> PathBuf {
        self.skins_dir.join(id)
    }

    pub fn is_installed(&self, id: &str) -> bool {
        self.skin_folder(id).is_dir()
    }

    /// Version recorded in the installed `info.txt`, if readable
    pub fn installed_version(&self, id: &str) -> Option<String> {
        let content = fs::read_to_string(self.skin_folder(id).join(INFO_FILE)).ok()?;
        match serde_json::from_str::<InstalledInfo>(&content) {
            Ok(info) => Some(info.version),
            Err(e) => {
                log_warning(&format!("Unreadable {} for skin {}: {}", INFO_FILE, id, e));
                None
            }
        }
    }

    pub fn update_available(&self, skin: &SkinRecord) -> bool {
        self.installed_version(&skin.id)
            .is_some_and(|installed| is_newer(&skin.version, &installed))
    }

    pub fn list(&self) -> Vec<SkinStatus> {
        self.skins
            .lock()
            .iter()
            .map(|skin| SkinStatus {
                installed: self.is_installed(&skin.id),
                update_available: self.update_available(skin),
                skin: skin.clone(),
            })
            .collect()
    }

    /// Replace the skin list with the remote catalog at `remote_url`
    pub fn refresh(&self, remote_url: &str) -> Result<usize> {
        log_action(&format!("Refreshing skins from {}", remote_url));
        let body = self.transfer.get_text(remote_url)?;
        let mut fetched: Vec<SkinRecord> =
            serde_json::from_str(&body).map_err(|e| ModError::remote(remote_url, e))?;
        fetched.retain(|skin| {
            let usable = is_path_segment(&skin.id);
            if !usable {
                log_warning(&format!("Skin {:?} ignored: unusable id", skin.id));
            }
            usable
        });

        let mut skins = self.skins.lock();
        *skins = fetched;
        self.store.save(skins.as_slice())?;
        log_info(&format!("Loaded {} skins", skins.len()));
        Ok(skins.len())
    }

    /// Catalogued skin with this id. Ids that are not a single folder name
    /// never match, so a skin folder always lies inside the skins directory.
    pub fn find(&self, id: &str) -> Result<SkinRecord> {
        if !is_path_segment(id) {
            return Err(ModError::UnknownMod(id.to_string()));
        }
        self.skins
            .lock()
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| ModError::UnknownMod(id.to_string()))
    }

    pub fn install(&self, id: &str) -> Result<()> {
        let _guard = self.locks.acquire(id)?;
        let skin = self.find(id)?;
        log_action(&format!("install skin {}", id));
        self.install_files(&skin)
    }

    pub fn uninstall(&self, id: &str) -> Result<()> {
        let _guard = self.locks.acquire(id)?;
        let skin = self.find(id)?;
        log_action(&format!("uninstall skin {}", id));
        self.remove_folder(&skin.id)
    }

    pub fn update(&self, id: &str) -> Result<()> {
        let _guard = self.locks.acquire(id)?;
        let skin = self.find(id)?;
        log_action(&format!("update skin {}", id));
        self.remove_folder(&skin.id)?;
        self.install_files(&skin)
    }

    /// Stage both files in the downloads dir, then copy them into the skin folder
    fn install_files(&self, skin: &SkinRecord) -> Result<()> {
        let staging = self.downloads.join(&skin.id);
        fs::create_dir_all(&staging).map_err(|e| ModError::persistence(&staging, e))?;

        log_download(&format!("Downloading skin {} {}", skin.name, skin.version));
        for (url, file) in [(skin.info_url(), INFO_FILE), (skin.texture_url(), TEXTURE_FILE)] {
            self.transfer.download(&url, &staging.join(file), &|_| {})?;
        }

        let folder = self.skin_folder(&skin.id);
        fs::create_dir_all(&folder)
            .map_err(|e| ModError::install(&skin.id, Artifact::SkinFolder, e))?;
        for file in [INFO_FILE, TEXTURE_FILE] {
            copy_into(&staging, &folder, file)
                .map_err(|e| ModError::install(&skin.id, Artifact::SkinFolder, e))?;
        }

        if let Err(e) = fs::remove_dir_all(&staging) {
            log_warning(&format!("Could not remove {}: {}", staging.display(), e));
        }
        log_install(&format!("Installed skin {} {}", skin.name, skin.version));
        Ok(())
    }

    fn remove_folder(&self, id: &str) -> Result<()> {
        let folder = self.skin_folder(id);
        if folder.is_dir() {
            fs::remove_dir_all(&folder)
                .map_err(|e| ModError::install(id, Artifact::SkinFolder, e))?;
            log_install(&format!("Uninstalled skin {}", id));
        }
        Ok(())
    }
}

fn copy_into(from_dir: &Path, to_dir: &Path, file: &str) -> std::io::Result<u64> {
    fs::copy(from_dir.join(file), to_dir.join(file))
}
