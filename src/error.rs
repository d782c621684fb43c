//! Error types shared by every ModHaven component
//!
//! All errors are scoped to a single mod: callers report them per mod and
//! keep processing the rest of the catalog.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::games::Game;

pub type Result<T> = std::result::Result<T, ModError>;

/// The on-disk artifact an install operation was touching when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    EnabledPlugin,
    DisabledPlugin,
    Config,
    Localization,
    Log,
    Data,
    Levels,
    Archive,
    InstallRoot,
    SkinFolder,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Artifact::EnabledPlugin => "enabled plugin file",
            Artifact::DisabledPlugin => "disabled plugin file",
            Artifact::Config => "config file",
            Artifact::Localization => "localization file",
            Artifact::Log => "log file",
            Artifact::Data => "data directory",
            Artifact::Levels => "levels directory",
            Artifact::Archive => "archive",
            Artifact::InstallRoot => "install root",
            Artifact::SkinFolder => "skin folder",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ModError {
    /// A version string had a non-numeric component after its prefix was stripped
    #[error("malformed version string '{version}'")]
    MalformedVersion { version: String },

    /// Catalog or settings file could not be read or written
    #[error("failed to persist {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Network or API failure while talking to a remote service
    #[error("failed to fetch {target}: {reason}")]
    RemoteFetch { target: String, reason: String },

    /// A network call exceeded the configured timeout
    #[error("timed out while fetching {target}")]
    TimedOut { target: String },

    /// A filesystem mutation failed part-way through a mod operation
    #[error("{mod_name}: failed on {artifact}: {source}")]
    InstallOperation {
        mod_name: String,
        artifact: Artifact,
        #[source]
        source: std::io::Error,
    },

    #[error("no mod named '{0}' in the catalog")]
    UnknownMod(String),

    /// Another operation on the same mod is still running
    #[error("an operation on '{0}' is already in progress")]
    Busy(String),

    #[error("no installation root configured for {0}")]
    GameRootNotSet(Game),

    #[error("{} is not a valid {game} installation", path.display())]
    InvalidGameRoot { game: Game, path: PathBuf },

    #[error("latest release of {owner}/{repo} has no downloadable assets")]
    NoReleaseAsset { owner: String, repo: String },
}

impl ModError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ModError::Persistence {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn install(mod_name: &str, artifact: Artifact, source: std::io::Error) -> Self {
        ModError::InstallOperation {
            mod_name: mod_name.to_string(),
            artifact,
            source,
        }
    }

    pub(crate) fn remote(target: impl Into<String>, reason: impl fmt::Display) -> Self {
        ModError::RemoteFetch {
            target: target.into(),
            reason: reason.to_string(),
        }
    }
}
