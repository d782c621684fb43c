//! Mod catalog: record types, local persistence and remote reconciliation
//!
//! A catalog is an ordered list of [`ModRecord`]s. Order is first-seen order:
//! entries loaded from the local cache first, then remote newcomers appended.

mod reconcile;
mod store;

pub(crate) use reconcile::pending_updates;
pub use reconcile::{reconcile_catalog, ReconcileReport, Reconciler};
pub use store::CatalogStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::installers::is_path_segment;

/// Stable name of a mod, unique within one catalog
pub type ModIdentity = String;

pub type Catalog = Vec<ModRecord>;

/// Entry of the remote catalog: identity and source fields only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModSeed {
    pub name: ModIdentity,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    pub github_author: String,
    pub github_repo: String,
    pub plugin_file: String,
    #[serde(default)]
    pub required_dlls: Vec<String>,
}

impl ModSeed {
    /// First field that is not usable as a file or directory name, if any
    pub fn invalid_path_field(&self) -> Option<&'static str> {
        invalid_path_field(&self.name, &self.plugin_file)
    }
}

/// Full metadata of one mod as stored in the local catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModRecord {
    pub name: ModIdentity,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    pub github_author: String,
    pub github_repo: String,
    pub plugin_file: String,
    #[serde(default)]
    pub required_dlls: Vec<String>,

    #[serde(default)]
    pub installed_version: Option<String>,
    #[serde(default)]
    pub latest_version: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub release_date: Option<DateTime<Utc>>,
}

impl ModRecord {
    /// A never-installed record built from a remote seed
    pub fn from_seed(seed: ModSeed) -> Self {
        Self {
            name: seed.name,
            author: seed.author,
            description: seed.description,
            github_author: seed.github_author,
            github_repo: seed.github_repo,
            plugin_file: seed.plugin_file,
            required_dlls: seed.required_dlls,
            installed_version: None,
            latest_version: None,
            download_url: None,
            release_date: None,
        }
    }

    /// Installed version, treating an empty string as never installed
    pub fn installed(&self) -> Option<&str> {
        self.installed_version
            .as_deref()
            .filter(|v| !v.trim().is_empty())
    }

    pub fn requires_dll(&self, dll_name: &str) -> bool {
        self.required_dlls
            .iter()
            .any(|dll| dll.eq_ignore_ascii_case(dll_name))
    }

    /// True when the latest known release is strictly newer than what is installed
    pub fn update_available(&self) -> bool {
        match (self.installed(), self.latest_version.as_deref()) {
            (Some(installed), Some(latest)) => crate::version::is_newer(latest, installed),
            _ => false,
        }
    }

    /// First field that is not usable as a file or directory name, if any
    pub fn invalid_path_field(&self) -> Option<&'static str> {
        invalid_path_field(&self.name, &self.plugin_file)
    }

    pub fn repo_url(&self) -> String {
        format!(
            "https://github.com/{}/{}",
            self.github_author, self.github_repo
        )
    }
}

/// Mod names and plugin files become path components under `Modding/`
fn invalid_path_field(name: &str, plugin_file: &str) -> Option<&'static str> {
    if !is_path_segment(name) {
        Some("name")
    } else if !is_path_segment(plugin_file) {
        Some("pluginFile")
    } else {
        None
    }
}
