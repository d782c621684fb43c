//! Where a mod's files live under a game installation

use std::path::{Component, Path, PathBuf};

use crate::catalog::ModRecord;
use crate::error::Artifact;
use crate::games::{Game, MODDING_DIR};

/// Directory layout of one game installation.
///
/// Everything lives under `<root>/Modding` except the game's framework mod,
/// whose archive is extracted into the root itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ModLayout {
    game_root: PathBuf,
    framework_mod: Option<String>,
}

impl ModLayout {
    pub fn new(game_root: impl Into<PathBuf>, framework_mod: Option<&str>) -> Self {
        Self {
            game_root: game_root.into(),
            framework_mod: framework_mod.map(str::to_string),
        }
    }

    pub fn for_game(game: Game, game_root: impl Into<PathBuf>) -> Self {
        Self::new(game_root, game.framework_mod())
    }

    pub fn game_root(&self) -> &Path {
        &self.game_root
    }

    pub fn modding_root(&self) -> PathBuf {
        self.game_root.join(MODDING_DIR)
    }

    pub fn is_framework(&self, record: &ModRecord) -> bool {
        self.framework_mod.as_deref() == Some(record.name.as_str())
    }

    /// Directory an archive for `record` is extracted into
    pub fn install_root(&self, record: &ModRecord) -> PathBuf {
        if self.is_framework(record) {
            self.game_root.clone()
        } else {
            self.modding_root()
        }
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.modding_root().join("plugins")
    }

    pub fn disabled_dir(&self) -> PathBuf {
        self.modding_root().join("disabled")
    }

    pub fn skins_dir(&self) -> PathBuf {
        self.modding_root().join("skins")
    }

    pub fn enabled_path(&self, record: &ModRecord) -> PathBuf {
        self.plugins_dir().join(&record.plugin_file)
    }

    pub fn disabled_path(&self, record: &ModRecord) -> PathBuf {
        self.disabled_dir().join(&record.plugin_file)
    }

    pub fn config_file(&self, record: &ModRecord) -> PathBuf {
        self.modding_root()
            .join("config")
            .join(format!("{}.cfg", record.name))
    }

    pub fn localization_file(&self, record: &ModRecord) -> PathBuf {
        self.modding_root()
            .join("localization")
            .join(format!("{}.txt", record.name))
    }

    pub fn log_file(&self, record: &ModRecord) -> PathBuf {
        self.modding_root()
            .join("logs")
            .join(format!("{}.log", record.name))
    }

    pub fn data_dir(&self, record: &ModRecord) -> PathBuf {
        self.modding_root().join("data").join(&record.name)
    }

    pub fn levels_dir(&self, record: &ModRecord) -> PathBuf {
        self.modding_root().join("levels").join(&record.name)
    }

    /// Every artifact an uninstall removes, in removal order
    pub fn owned_artifacts(&self, record: &ModRecord) -> [(Artifact, PathBuf); 7] {
        [
            (Artifact::EnabledPlugin, self.enabled_path(record)),
            (Artifact::DisabledPlugin, self.disabled_path(record)),
            (Artifact::Config, self.config_file(record)),
            (Artifact::Localization, self.localization_file(record)),
            (Artifact::Log, self.log_file(record)),
            (Artifact::Data, self.data_dir(record)),
            (Artifact::Levels, self.levels_dir(record)),
        ]
    }
}

/// True when `name` is exactly one normal path component, so joining it
/// onto a directory can never escape that directory or name the directory itself
pub fn is_path_segment(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;

    #[test]
    fn test_paths_are_keyed_by_name() {
        let layout = ModLayout::for_game(Game::Blasphemous, "/games/Blas");
        let mut r = record("Rando");
        r.plugin_file = "Randomizer.dll".to_string();

        assert_eq!(
            layout.enabled_path(&r),
            PathBuf::from("/games/Blas/Modding/plugins/Randomizer.dll")
        );
        assert_eq!(
            layout.disabled_path(&r),
            PathBuf::from("/games/Blas/Modding/disabled/Randomizer.dll")
        );
        assert_eq!(
            layout.config_file(&r),
            PathBuf::from("/games/Blas/Modding/config/Rando.cfg")
        );
        assert_eq!(
            layout.localization_file(&r),
            PathBuf::from("/games/Blas/Modding/localization/Rando.txt")
        );
        assert_eq!(layout.log_file(&r), PathBuf::from("/games/Blas/Modding/logs/Rando.log"));
        assert_eq!(layout.data_dir(&r), PathBuf::from("/games/Blas/Modding/data/Rando"));
        assert_eq!(layout.levels_dir(&r), PathBuf::from("/games/Blas/Modding/levels/Rando"));
    }

    #[test]
    fn test_framework_mod_installs_into_game_root() {
        let layout = ModLayout::for_game(Game::Blasphemous, "/games/Blas");
        assert_eq!(layout.install_root(&record("Modding API")), PathBuf::from("/games/Blas"));
        assert_eq!(
            layout.install_root(&record("Rando")),
            PathBuf::from("/games/Blas/Modding")
        );

        let blas2 = ModLayout::for_game(Game::Blasphemous2, "/games/Blas2");
        assert_eq!(
            blas2.install_root(&record("Modding API")),
            PathBuf::from("/games/Blas2/Modding")
        );
    }

    #[test]
    fn test_path_segment() {
        assert!(is_path_segment("Rando"));
        assert!(is_path_segment("Modding API"));
        assert!(is_path_segment("Randomizer.dll"));

        for bad in ["", ".", "..", "../Rando", "data/Rando", "/Rando"] {
            assert!(!is_path_segment(bad), "{:?} accepted", bad);
        }
    }
}
