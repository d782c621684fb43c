//! GitHub release lookups

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{ModError, Result};
use crate::remote::{ReleaseInfo, ReleaseSource};
use crate::utils::{body_error, build_agent, request_error};
use crate::version::clean_tag;

const API_BASE: &str = "https://api.github.com";

/// GitHub release metadata
#[derive(Deserialize, Debug, Clone)]
pub struct GithubRelease {
    pub tag_name: String,
    pub created_at: DateTime<Utc>,
    pub assets: Vec<GithubAsset>,
}

/// GitHub release asset
#[derive(Deserialize, Debug, Clone)]
pub struct GithubAsset {
    pub name: String,
    pub browser_download_url: String,
}

impl GithubRelease {
    /// Reduce to what the catalog keeps; the first asset is the mod archive
    pub fn into_release_info(self, owner: &str, repo: &str) -> Result<ReleaseInfo> {
        let asset = self
            .assets
            .into_iter()
            .next()
            .ok_or_else(|| ModError::NoReleaseAsset {
                owner: owner.to_string(),
                repo: repo.to_string(),
            })?;
        Ok(ReleaseInfo {
            version: clean_tag(&self.tag_name),
            download_url: asset.browser_download_url,
            created_at: self.created_at,
        })
    }
}

/// [`ReleaseSource`] backed by the GitHub REST API
pub struct GithubClient {
    agent: ureq::Agent,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(timeout: Duration, token: Option<String>) -> Self {
        Self {
            agent: build_agent(timeout),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }
}

impl ReleaseSource for GithubClient {
    fn latest_release(&self, owner: &str, repo: &str) -> Result<ReleaseInfo> {
        let url = format!("{}/repos/{}/{}/releases/latest", API_BASE, owner, repo);
        let mut request = self
            .agent
            .get(&url)
            .set("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("token {}", token));
        }

        let response = request.call().map_err(|e| request_error(&url, e))?;
        let release: GithubRelease = response.into_json().map_err(|e| body_error(&url, e))?;
        release.into_release_info(owner, repo)
    }
}
