use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ModError, Result};
use crate::games::Game;
use crate::haven_path;

/// Default timeout applied to every network call
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

// ============================================================================
// Main App Config
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub blas1_root: Option<PathBuf>,
    pub blas2_root: Option<PathBuf>,
    /// Personal access token for the GitHub API (raises the rate limit)
    pub github_token: Option<String>,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            blas1_root: None,
            blas2_root: None,
            github_token: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    fn get_path() -> PathBuf {
        haven_path!("config.json")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::get_path())
    }

    /// Read a config file, falling back to defaults when it is missing or unreadable
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                if let Ok(config) = serde_json::from_str(&content) {
                    return config;
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ModError::persistence(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ModError::persistence(path, e.into()))?;
        fs::write(path, json).map_err(|e| ModError::persistence(path, e))
    }

    pub fn game_root(&self, game: Game) -> Option<&Path> {
        match game {
            Game::Blasphemous => self.blas1_root.as_deref(),
            Game::Blasphemous2 => self.blas2_root.as_deref(),
        }
    }

    /// Resolve the root for a game, failing when none is configured
    pub fn require_root(&self, game: Game) -> Result<PathBuf> {
        self.game_root(game)
            .map(Path::to_path_buf)
            .ok_or(ModError::GameRootNotSet(game))
    }

    /// Store a new root after checking that it really is an installation of `game`
    pub fn set_game_root(&mut self, game: Game, root: PathBuf) -> Result<()> {
        if !game.is_root_valid(&root) {
            return Err(ModError::InvalidGameRoot { game, path: root });
        }
        match game {
            Game::Blasphemous => self.blas1_root = Some(root),
            Game::Blasphemous2 => self.blas2_root = Some(root),
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Directory for downloaded archives
    pub fn get_downloads_path() -> PathBuf {
        haven_path!("downloads")
    }

    /// Local catalog file for a game's mods
    pub fn get_mods_catalog_path(game: Game) -> PathBuf {
        haven_path!("cache", format!("{}_mods.json", game.key()))
    }

    /// Local catalog file for a game's skins
    pub fn get_skins_catalog_path(game: Game) -> PathBuf {
        haven_path!("cache", format!("{}_skins.json", game.key()))
    }
}
