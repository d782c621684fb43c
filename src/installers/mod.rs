//! Mod install state machine
//!
//! A mod's state is never stored: it is read off the filesystem by looking
//! for its plugin file in the enabled (`plugins/`) and disabled (`disabled/`)
//! directories.
//!
//! ```text
//! Uninstalled --install--> EnabledInstalled <--disable/enable--> DisabledInstalled
//!      ^                          |                                     |
//!      +-------------uninstall----+-------------------------------------+
//! ```

mod archive;
mod layout;

pub use archive::{extract_archive, extract_from};
pub use layout::{is_path_segment, ModLayout};

use std::fs;
use std::io;
use std::path::Path;

use crate::catalog::ModRecord;
use crate::error::{Artifact, ModError, Result};
use crate::logging::{log_install, log_warning};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Uninstalled,
    EnabledInstalled,
    DisabledInstalled,
}

impl InstallState {
    /// Derive the state of `record` from plugin file presence
    pub fn probe(layout: &ModLayout, record: &ModRecord) -> Self {
        if layout.enabled_path(record).is_file() {
            InstallState::EnabledInstalled
        } else if layout.disabled_path(record).is_file() {
            InstallState::DisabledInstalled
        } else {
            InstallState::Uninstalled
        }
    }

    pub fn is_installed(&self) -> bool {
        !matches!(self, InstallState::Uninstalled)
    }

    pub fn label(&self) -> &'static str {
        match self {
            InstallState::Uninstalled => "not installed",
            InstallState::EnabledInstalled => "enabled",
            InstallState::DisabledInstalled => "disabled",
        }
    }
}

/// Drives install/uninstall/enable/disable for the mods of one game.
///
/// Operations stop at the first filesystem failure and report which artifact
/// failed; nothing already done is rolled back.
#[derive(Debug, Clone)]
pub struct Installer {
    layout: ModLayout,
}

impl Installer {
    pub fn new(layout: ModLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ModLayout {
        &self.layout
    }

    pub fn state(&self, record: &ModRecord) -> InstallState {
        InstallState::probe(&self.layout, record)
    }

    /// Probe the state, removing a redundant disabled copy when the plugin
    /// sits in both directories
    pub fn normalize(&self, record: &ModRecord) -> Result<InstallState> {
        let enabled = self.layout.enabled_path(record);
        let disabled = self.layout.disabled_path(record);
        if enabled.is_file() && disabled.is_file() {
            log_warning(&format!(
                "{} is both enabled and disabled, removing the disabled copy",
                record.name
            ));
            fs::remove_file(&disabled)
                .map_err(|e| ModError::install(&record.name, Artifact::DisabledPlugin, e))?;
        }
        Ok(self.state(record))
    }

    /// Extract `archive` into the mod's install root and record `version` as installed.
    ///
    /// A fresh install always ends enabled. An archive that does not provide
    /// the plugin file fails with [`Artifact::EnabledPlugin`] and leaves the
    /// installed version untouched; the extracted files stay behind.
    pub fn install(
        &self,
        record: &mut ModRecord,
        archive: &Path,
        version: &str,
    ) -> Result<InstallState> {
        let root = self.layout.install_root(record);
        fs::create_dir_all(&root)
            .map_err(|e| ModError::install(&record.name, Artifact::InstallRoot, e))?;

        let files = extract_archive(archive, &root)
            .map_err(|e| ModError::install(&record.name, Artifact::Archive, e))?;
        log_install(&format!(
            "Extracted {} files for {} {} into {}",
            files,
            record.name,
            version,
            root.display()
        ));

        // An archive or earlier install may have left the plugin disabled
        self.enable(record)?;
        if self.state(record) != InstallState::EnabledInstalled {
            let missing = io::Error::new(
                io::ErrorKind::NotFound,
                format!("archive did not contain {}", record.plugin_file),
            );
            return Err(ModError::install(&record.name, Artifact::EnabledPlugin, missing));
        }

        record.installed_version = Some(version.to_string());
        Ok(InstallState::EnabledInstalled)
    }

    /// Remove every file and directory the mod owns. Missing artifacts are fine.
    pub fn uninstall(&self, record: &mut ModRecord) -> Result<InstallState> {
        for (artifact, path) in self.layout.owned_artifacts(record) {
            remove_artifact(&path)
                .map_err(|e| ModError::install(&record.name, artifact, e))?;
        }

        record.installed_version = None;
        log_install(&format!("Uninstalled {}", record.name));
        Ok(InstallState::Uninstalled)
    }

    /// Move the plugin from `disabled/` to `plugins/`.
    ///
    /// If `plugins/` already has a copy it is kept and the disabled copy is
    /// deleted. No-op when nothing is disabled.
    pub fn enable(&self, record: &ModRecord) -> Result<InstallState> {
        move_or_discard(
            record,
            (&self.layout.disabled_path(record), Artifact::DisabledPlugin),
            (&self.layout.enabled_path(record), Artifact::EnabledPlugin),
        )?;
        Ok(self.state(record))
    }

    /// Move the plugin from `plugins/` to `disabled/`, keeping an existing
    /// disabled copy over the enabled one.
    pub fn disable(&self, record: &ModRecord) -> Result<InstallState> {
        move_or_discard(
            record,
            (&self.layout.enabled_path(record), Artifact::EnabledPlugin),
            (&self.layout.disabled_path(record), Artifact::DisabledPlugin),
        )?;
        Ok(self.state(record))
    }
}

/// Move `from` to `to`; when `to` already exists the destination wins and
/// `from` is deleted instead.
fn move_or_discard(
    record: &ModRecord,
    (from, from_artifact): (&Path, Artifact),
    (to, to_artifact): (&Path, Artifact),
) -> Result<()> {
    if !from.is_file() {
        return Ok(());
    }

    if to.exists() {
        fs::remove_file(from).map_err(|e| ModError::install(&record.name, from_artifact, e))?;
        return Ok(());
    }

    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| ModError::install(&record.name, to_artifact, e))?;
    }
    fs::rename(from, to).map_err(|e| ModError::install(&record.name, to_artifact, e))
}

fn remove_artifact(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{record, zip_bytes, TestGame};

    #[test]
    fn test_probe_states() {
        let game = TestGame::new();
        let r = record("Rando");
        assert_eq!(game.installer.state(&r), InstallState::Uninstalled);

        game.place_disabled(&r);
        assert_eq!(game.installer.state(&r), InstallState::DisabledInstalled);

        game.place_enabled(&r);
        assert_eq!(game.installer.state(&r), InstallState::EnabledInstalled);
    }

    #[test]
    fn test_normalize_drops_redundant_disabled_copy() {
        let game = TestGame::new();
        let r = record("Rando");
        game.place_enabled(&r);
        game.place_disabled(&r);

        assert_eq!(game.installer.normalize(&r).unwrap(), InstallState::EnabledInstalled);
        assert!(game.layout.enabled_path(&r).exists());
        assert!(!game.layout.disabled_path(&r).exists());
    }

    #[test]
    fn test_install_extracts_and_enables() {
        let game = TestGame::new();
        let mut r = record("Rando");
        let archive = game.mod_archive(&r, "1.2.0");

        let state = game.installer.install(&mut r, &archive, "1.2.0").unwrap();

        assert_eq!(state, InstallState::EnabledInstalled);
        assert_eq!(r.installed_version.as_deref(), Some("1.2.0"));
        assert!(game.layout.enabled_path(&r).is_file());
        assert!(game.layout.data_dir(&r).join("items.json").is_file());
    }

    #[test]
    fn test_install_over_disabled_ends_enabled() {
        let game = TestGame::new();
        let mut r = record("Rando");
        game.place_disabled(&r);
        let archive = game.mod_archive(&r, "2.0.0");

        let state = game.installer.install(&mut r, &archive, "2.0.0").unwrap();

        assert_eq!(state, InstallState::EnabledInstalled);
        assert!(!game.layout.disabled_path(&r).exists());
        assert_eq!(
            fs::read_to_string(game.layout.enabled_path(&r)).unwrap(),
            "Rando 2.0.0"
        );
    }

    #[test]
    fn test_framework_mod_extracts_into_root() {
        let game = TestGame::new();
        let mut api = record("Modding API");
        let archive = game.framework_archive(&api);

        let state = game.installer.install(&mut api, &archive, "1.5.0").unwrap();

        assert_eq!(state, InstallState::EnabledInstalled);
        assert!(game.layout.game_root().join("winhttp.dll").is_file());
        assert!(game.layout.enabled_path(&api).is_file());
    }

    #[test]
    fn test_install_bad_archive_reports_artifact() {
        let game = TestGame::new();
        let mut r = record("Rando");
        let archive = game.root().join("broken.zip");
        fs::write(&archive, "nope").unwrap();

        match game.installer.install(&mut r, &archive, "1.0.0") {
            Err(ModError::InstallOperation { mod_name, artifact, .. }) => {
                assert_eq!(mod_name, "Rando");
                assert_eq!(artifact, Artifact::Archive);
            }
            other => panic!("expected InstallOperation, got {:?}", other),
        }
        assert_eq!(r.installed_version, None);
    }

    #[test]
    fn test_install_without_plugin_fails() {
        let game = TestGame::new();
        let mut r = record("Rando");
        let archive = game.root().join("no_plugin.zip");
        fs::write(&archive, zip_bytes(&[("data/Rando/items.json", "{}")])).unwrap();

        match game.installer.install(&mut r, &archive, "1.0.0") {
            Err(ModError::InstallOperation { artifact, source, .. }) => {
                assert_eq!(artifact, Artifact::EnabledPlugin);
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected InstallOperation, got {:?}", other),
        }
        assert_eq!(r.installed_version, None);
        assert_eq!(game.installer.state(&r), InstallState::Uninstalled);
    }

    #[test]
    fn test_install_then_uninstall_leaves_nothing() {
        let game = TestGame::new();
        let mut r = record("Rando");
        let archive = game.mod_archive(&r, "1.0.0");
        game.installer.install(&mut r, &archive, "1.0.0").unwrap();
        game.place_runtime_files(&r);

        let state = game.installer.uninstall(&mut r).unwrap();

        assert_eq!(state, InstallState::Uninstalled);
        assert_eq!(game.installer.state(&r), InstallState::Uninstalled);
        assert_eq!(r.installed_version, None);
        for (artifact, path) in game.layout.owned_artifacts(&r) {
            assert!(!path.exists(), "{} still present at {}", artifact, path.display());
        }
    }

    #[test]
    fn test_uninstall_with_nothing_present_is_ok() {
        let game = TestGame::new();
        let mut r = record("Ghost");
        assert_eq!(game.installer.uninstall(&mut r).unwrap(), InstallState::Uninstalled);
    }

    #[test]
    fn test_uninstall_stops_at_first_failure() {
        let game = TestGame::new();
        let mut r = record("Rando");
        r.installed_version = Some("1.0.0".to_string());
        game.place_enabled(&r);
        game.place_runtime_files(&r);
        let logs = game.layout.modding_root().join("logs");
        fs::remove_dir_all(&logs).unwrap();
        fs::write(&logs, "not a directory").unwrap();

        match game.installer.uninstall(&mut r) {
            Err(ModError::InstallOperation { mod_name, artifact, .. }) => {
                assert_eq!(mod_name, "Rando");
                assert_eq!(artifact, Artifact::Log);
            }
            other => panic!("expected InstallOperation, got {:?}", other),
        }
        // Earlier artifacts are gone, later ones untouched
        assert!(!game.layout.enabled_path(&r).exists());
        assert!(!game.layout.config_file(&r).exists());
        assert!(game.layout.data_dir(&r).join("extra.bin").is_file());
        assert!(game.layout.levels_dir(&r).is_dir());
        assert_eq!(r.installed_version.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_disable_fails_when_disabled_dir_is_blocked() {
        let game = TestGame::new();
        let r = record("Rando");
        game.place_enabled(&r);
        fs::create_dir_all(game.layout.modding_root()).unwrap();
        fs::write(game.layout.disabled_dir(), "not a directory").unwrap();

        match game.installer.disable(&r) {
            Err(ModError::InstallOperation { artifact, .. }) => {
                assert_eq!(artifact, Artifact::DisabledPlugin);
            }
            other => panic!("expected InstallOperation, got {:?}", other),
        }
        assert!(game.layout.enabled_path(&r).is_file());
        assert_eq!(game.installer.state(&r), InstallState::EnabledInstalled);
    }

    #[test]
    fn test_uninstall_removes_both_plugin_copies() {
        let game = TestGame::new();
        let mut r = record("Rando");
        game.place_enabled(&r);
        game.place_disabled(&r);

        game.installer.uninstall(&mut r).unwrap();
        assert!(!game.layout.enabled_path(&r).exists());
        assert!(!game.layout.disabled_path(&r).exists());
    }

    #[test]
    fn test_enable_collision_keeps_enabled_copy() {
        let game = TestGame::new();
        let r = record("Rando");
        game.place_enabled(&r);
        fs::write(game.layout.enabled_path(&r), "enabled copy").unwrap();
        game.place_disabled(&r);

        let state = game.installer.enable(&r).unwrap();

        assert_eq!(state, InstallState::EnabledInstalled);
        assert_eq!(
            fs::read_to_string(game.layout.enabled_path(&r)).unwrap(),
            "enabled copy"
        );
        assert!(!game.layout.disabled_path(&r).exists());
    }

    #[test]
    fn test_disable_collision_keeps_disabled_copy() {
        let game = TestGame::new();
        let r = record("Rando");
        game.place_enabled(&r);
        game.place_disabled(&r);
        fs::write(game.layout.disabled_path(&r), "disabled copy").unwrap();

        let state = game.installer.disable(&r).unwrap();

        assert_eq!(state, InstallState::DisabledInstalled);
        assert!(!game.layout.enabled_path(&r).exists());
        assert_eq!(
            fs::read_to_string(game.layout.disabled_path(&r)).unwrap(),
            "disabled copy"
        );
    }

    #[test]
    fn test_disable_then_enable_round_trips() {
        let game = TestGame::new();
        let r = record("Rando");
        game.place_enabled(&r);

        assert_eq!(game.installer.disable(&r).unwrap(), InstallState::DisabledInstalled);
        assert!(!game.layout.enabled_path(&r).exists());

        assert_eq!(game.installer.enable(&r).unwrap(), InstallState::EnabledInstalled);
        assert!(game.layout.enabled_path(&r).is_file());
        assert!(!game.layout.disabled_path(&r).exists());
    }

    #[test]
    fn test_enable_and_disable_are_noops_when_uninstalled() {
        let game = TestGame::new();
        let r = record("Rando");
        assert_eq!(game.installer.enable(&r).unwrap(), InstallState::Uninstalled);
        assert_eq!(game.installer.disable(&r).unwrap(), InstallState::Uninstalled);
    }
}
