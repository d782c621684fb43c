//! Command dispatch for one game's mods
//!
//! [`ModManager`] is the single owner of a game's [`ModRegistry`]. Every
//! mutation goes through [`ModManager::refresh`] or [`ModManager::execute`];
//! nothing else touches the records.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::catalog::{
    pending_updates, CatalogStore, ModIdentity, ModRecord, ModSeed, ReconcileReport, Reconciler,
};
use crate::error::{ModError, Result};
use crate::games::Game;
use crate::installers::{InstallState, Installer, ModLayout};
use crate::logging::{log_action, log_download, log_error, log_info, log_warning};
use crate::registry::ModRegistry;
use crate::remote::{ReleaseInfo, ReleaseSource, Transfer};

/// A user action applied to one mod
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModCommand {
    Install,
    Uninstall,
    Enable,
    Disable,
    /// Uninstall followed by a fresh install of the latest release
    Update,
}

impl ModCommand {
    pub fn label(&self) -> &'static str {
        match self {
            ModCommand::Install => "install",
            ModCommand::Uninstall => "uninstall",
            ModCommand::Enable => "enable",
            ModCommand::Disable => "disable",
            ModCommand::Update => "update",
        }
    }
}

// ============================================================================
// Per-identity locks
// ============================================================================

/// Set of identities with an operation in flight
#[derive(Debug, Default)]
pub struct ModLocks {
    held: Mutex<HashSet<ModIdentity>>,
}

impl ModLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name` for the lifetime of the returned guard.
    /// Fails with [`ModError::Busy`] instead of waiting.
    pub fn acquire(&self, name: &str) -> Result<ModLockGuard<'_>> {
        let mut held = self.held.lock();
        if !held.insert(name.to_string()) {
            return Err(ModError::Busy(name.to_string()));
        }
        Ok(ModLockGuard {
            locks: self,
            name: name.to_string(),
        })
    }

    pub fn is_held(&self, name: &str) -> bool {
        self.held.lock().contains(name)
    }
}

pub struct ModLockGuard<'a> {
    locks: &'a ModLocks,
    name: String,
}

impl Drop for ModLockGuard<'_> {
    fn drop(&mut self) {
        self.locks.held.lock().remove(&self.name);
    }
}

// ============================================================================
// Manager
// ============================================================================

pub struct ModManager {
    game: Game,
    registry: Mutex<ModRegistry>,
    store: CatalogStore,
    installer: Installer,
    source: Arc<dyn ReleaseSource>,
    transfer: Arc<dyn Transfer>,
    downloads: PathBuf,
    locks: ModLocks,
}

impl ModManager {
    /// Load the persisted catalog and probe every record's state.
    ///
    /// A plugin found in both directories is collapsed to the enabled copy.
    pub fn new(
        game: Game,
        layout: ModLayout,
        store: CatalogStore,
        source: Arc<dyn ReleaseSource>,
        transfer: Arc<dyn Transfer>,
        downloads: PathBuf,
    ) -> Result<Self> {
        let registry = ModRegistry::from_catalog(store.load()?);
        let installer = Installer::new(layout);

        for record in registry.all() {
            if let Err(e) = installer.normalize(record) {
                log_warning(&format!("Could not normalize {}: {}", record.name, e));
            }
        }

        log_info(&format!(
            "Loaded {} {} mods from {}",
            registry.len(),
            game,
            store.path().display()
        ));

        Ok(Self {
            game,
            registry: Mutex::new(registry),
            store,
            installer,
            source,
            transfer,
            downloads,
            locks: ModLocks::new(),
        })
    }

    /// Open the manager for `game` from the saved settings, talking to GitHub
    #[cfg(feature = "net")]
    pub fn open(config: &crate::config::AppConfig, game: Game) -> Result<Self> {
        use crate::config::AppConfig;
        use crate::github::GithubClient;
        use crate::utils::HttpTransfer;

        let root = config.require_root(game)?;
        if !game.is_root_valid(&root) {
            return Err(ModError::InvalidGameRoot { game, path: root });
        }

        Self::new(
            game,
            ModLayout::for_game(game, root),
            CatalogStore::new(AppConfig::get_mods_catalog_path(game)),
            Arc::new(GithubClient::new(
                config.request_timeout(),
                config.github_token.clone(),
            )),
            Arc::new(HttpTransfer::new(config.request_timeout())),
            AppConfig::get_downloads_path(),
        )
    }

    pub fn game(&self) -> Game {
        self.game
    }

    pub fn layout(&self) -> &ModLayout {
        self.installer.layout()
    }

    /// Snapshot of every record with its current on-disk state, in catalog order
    pub fn list(&self) -> Vec<(ModRecord, InstallState)> {
        self.registry
            .lock()
            .all()
            .iter()
            .map(|r| (r.clone(), self.installer.state(r)))
            .collect()
    }

    pub fn find(&self, name: &str) -> Option<ModRecord> {
        self.registry.lock().find(name).cloned()
    }

    pub fn state(&self, name: &str) -> Result<InstallState> {
        let registry = self.registry.lock();
        let record = registry
            .find(name)
            .ok_or_else(|| ModError::UnknownMod(name.to_string()))?;
        Ok(self.installer.state(record))
    }

    /// Identities of installed mods with a newer release known
    pub fn pending_updates(&self) -> Vec<ModIdentity> {
        pending_updates(self.registry.lock().all())
            .into_iter()
            .collect()
    }

    /// Fetch the game's published catalog and reconcile against it
    pub fn refresh_default(&self) -> Result<ReconcileReport> {
        self.refresh(&self.game.mods_catalog_url())
    }

    /// Fetch the remote catalog at `remote_url` and merge it into the registry.
    ///
    /// The registry stays locked for the whole pass, so no command can persist
    /// a half-merged catalog. Commands already running keep their per-mod lock
    /// and write back once the pass is over.
    pub fn refresh(&self, remote_url: &str) -> Result<ReconcileReport> {
        log_action(&format!("Refreshing {} catalog from {}", self.game, remote_url));
        let body = self.transfer.get_text(remote_url)?;
        let seeds: Vec<ModSeed> =
            serde_json::from_str(&body).map_err(|e| ModError::remote(remote_url, e))?;

        let mut registry = self.registry.lock();
        let report = Reconciler::new(self.source.as_ref())
            .with_store(&self.store)
            .run(&mut registry, &seeds);

        for name in &report.updates {
            log_info(&format!("Update available for {}", name));
        }
        Ok(report)
    }

    pub fn execute(&self, name: &str, command: ModCommand) -> Result<InstallState> {
        self.execute_with_progress(name, command, &|_| {})
    }

    /// Run `command` against the mod called `name`.
    ///
    /// Fails with [`ModError::Busy`] when another command on the same mod is
    /// still running. The catalog is persisted after the command, and a save
    /// failure is returned even though the filesystem change already happened.
    pub fn execute_with_progress(
        &self,
        name: &str,
        command: ModCommand,
        progress: &dyn Fn(f32),
    ) -> Result<InstallState> {
        let _guard = self.locks.acquire(name)?;
        let mut record = self
            .find(name)
            .ok_or_else(|| ModError::UnknownMod(name.to_string()))?;

        log_action(&format!("{} {}", command.label(), name));

        let outcome = match command {
            ModCommand::Install => self.install(&mut record, progress),
            ModCommand::Uninstall => self.installer.uninstall(&mut record),
            ModCommand::Enable => self.installer.enable(&record),
            ModCommand::Disable => self.installer.disable(&record),
            ModCommand::Update => self
                .installer
                .uninstall(&mut record)
                .and_then(|_| self.install(&mut record, progress)),
        };

        // Write back even on failure: a partial uninstall or update may already
        // have changed what is installed.
        let state = self.installer.state(&record);
        if state == InstallState::Uninstalled {
            record.installed_version = None;
        }
        let saved = self.write_back(&record, command);

        match outcome {
            Ok(state) => {
                saved?;
                log_info(&format!("{} is now {}", name, state.label()));
                Ok(state)
            }
            Err(e) => {
                log_error(&format!("Failed to {} {}: {}", command.label(), name, e));
                Err(e)
            }
        }
    }

    /// Download the latest release and extract it
    fn install(&self, record: &mut ModRecord, progress: &dyn Fn(f32)) -> Result<InstallState> {
        let release = self
            .source
            .latest_release(&record.github_author, &record.github_repo)?;
        record.latest_version = Some(release.version.clone());
        record.download_url = Some(release.download_url.clone());
        record.release_date = Some(release.created_at);

        let archive = self.download_release(record, &release, progress)?;
        let result = self.installer.install(record, &archive, &release.version);

        if let Err(e) = fs::remove_file(&archive) {
            log_warning(&format!("Could not remove {}: {}", archive.display(), e));
        }
        result
    }

    fn download_release(
        &self,
        record: &ModRecord,
        release: &ReleaseInfo,
        progress: &dyn Fn(f32),
    ) -> Result<PathBuf> {
        let archive = archive_path(&self.downloads, record, &release.version);
        log_download(&format!(
            "Downloading {} {} from {}",
            record.name, release.version, release.download_url
        ));
        if let Err(e) = self
            .transfer
            .download(&release.download_url, &archive, progress)
        {
            if archive.exists() {
                if let Err(rm) = fs::remove_file(&archive) {
                    log_warning(&format!("Could not remove {}: {}", archive.display(), rm));
                }
            }
            return Err(e);
        }
        Ok(archive)
    }

    /// Copy per-install fields back into the registry and persist
    fn write_back(&self, record: &ModRecord, command: ModCommand) -> Result<()> {
        let mut registry = self.registry.lock();
        let fetched_release = matches!(command, ModCommand::Install | ModCommand::Update);
        registry.update_with(&record.name, |stored| {
            stored.installed_version = record.installed_version.clone();
            // A refresh may have run since the snapshot was taken
            if fetched_release {
                stored.latest_version = record.latest_version.clone();
                stored.download_url = record.download_url.clone();
                stored.release_date = record.release_date;
            }
        });

        if command == ModCommand::Uninstall {
            for dll in &record.required_dlls {
                if registry.count_installed_requiring(dll, self.installer.layout()) == 0 {
                    log_info(&format!(
                        "{} is no longer required by any installed mod and may be removed",
                        dll
                    ));
                }
            }
        }

        self.store.save(registry.all()).inspect_err(|e| {
            log_error(&format!("Failed to save catalog: {}", e));
        })
    }
}

/// `<downloads>/<Name_with_underscores>_<version>.zip`
pub fn archive_path(downloads: &Path, record: &ModRecord, version: &str) -> PathBuf {
    downloads.join(format!("{}_{}.zip", record.name.replace(' ', "_"), version))
}
