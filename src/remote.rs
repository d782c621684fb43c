//! Collaborator interfaces for everything that leaves the machine
//!
//! The catalog and installer code only talks to these traits; the `net`
//! feature provides the real HTTP implementations in [`crate::github`] and
//! [`crate::utils`].

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::Result;

/// Latest published build of a mod
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseInfo {
    /// Release tag with any prefix stripped (`v1.2.0` -> `1.2.0`)
    pub version: String,
    /// Direct URL of the first release asset
    pub download_url: String,
    pub created_at: DateTime<Utc>,
}

/// Looks up the latest release of a repository on the hosting service
pub trait ReleaseSource: Send + Sync {
    fn latest_release(&self, owner: &str, repo: &str) -> Result<ReleaseInfo>;
}

/// Plain file transfer over HTTP
pub trait Transfer: Send + Sync {
    /// Fetch a small text document such as a remote catalog
    fn get_text(&self, url: &str) -> Result<String>;

    /// Download `url` to `dest`, reporting progress as a 0.0..=1.0 fraction
    /// when the size is known
    fn download(&self, url: &str, dest: &Path, progress: &dyn Fn(f32)) -> Result<()>;
}
