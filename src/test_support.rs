//! Shared fixtures for unit tests

use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use crate::catalog::{ModRecord, ModSeed};
use crate::error::{ModError, Result};
use crate::games::Game;
use crate::installers::{Installer, ModLayout};
use crate::remote::{ReleaseInfo, ReleaseSource, Transfer};

pub fn seed(name: &str) -> ModSeed {
    ModSeed {
        name: name.to_string(),
        author: "Author".to_string(),
        description: format!("{} description", name),
        github_author: "owner".to_string(),
        github_repo: name.replace(' ', ""),
        plugin_file: format!("{}.dll", name.replace(' ', "")),
        required_dlls: Vec::new(),
    }
}

pub fn record(name: &str) -> ModRecord {
    ModRecord::from_seed(seed(name))
}

pub fn installed(name: &str, version: &str) -> ModRecord {
    let mut r = record(name);
    r.installed_version = Some(version.to_string());
    r
}

/// Build an in-memory zip from `(path, contents)` pairs
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Archive contents a regular mod release ships with (relative to `Modding/`)
pub fn mod_archive_entries(record: &ModRecord, version: &str) -> Vec<(String, String)> {
    vec![
        (
            format!("plugins/{}", record.plugin_file),
            format!("{} {}", record.name, version),
        ),
        (format!("data/{}/items.json", record.name), "{}".to_string()),
        (
            format!("localization/{}.txt", record.name),
            "en: hello".to_string(),
        ),
    ]
}

pub fn mod_zip(record: &ModRecord, version: &str) -> Vec<u8> {
    let entries = mod_archive_entries(record, version);
    let borrowed: Vec<(&str, &str)> = entries
        .iter()
        .map(|(n, c)| (n.as_str(), c.as_str()))
        .collect();
    zip_bytes(&borrowed)
}

/// A fake Blasphemous installation in a temp directory
pub struct TestGame {
    _tmp: TempDir,
    pub layout: ModLayout,
    pub installer: Installer,
}

impl TestGame {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("Blasphemous");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join(Game::Blasphemous.exe_name()), "").unwrap();

        let layout = ModLayout::for_game(Game::Blasphemous, &root);
        Self {
            _tmp: tmp,
            installer: Installer::new(layout.clone()),
            layout,
        }
    }

    pub fn root(&self) -> &Path {
        self.layout.game_root()
    }

    fn write(path: PathBuf, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub fn place_enabled(&self, record: &ModRecord) {
        Self::write(self.layout.enabled_path(record), "plugin");
    }

    pub fn place_disabled(&self, record: &ModRecord) {
        Self::write(self.layout.disabled_path(record), "plugin");
    }

    /// Files a mod creates while the game runs
    pub fn place_runtime_files(&self, record: &ModRecord) {
        Self::write(self.layout.config_file(record), "setting=1");
        Self::write(self.layout.log_file(record), "log line");
        Self::write(self.layout.levels_dir(record).join("level1/room.json"), "{}");
        Self::write(self.layout.data_dir(record).join("extra.bin"), "data");
    }

    pub fn mod_archive(&self, record: &ModRecord, version: &str) -> PathBuf {
        let path = self.root().join(format!("{}_{}.zip", record.name, version));
        fs::write(&path, mod_zip(record, version)).unwrap();
        path
    }

    pub fn framework_archive(&self, record: &ModRecord) -> PathBuf {
        let plugin = format!("Modding/plugins/{}", record.plugin_file);
        let path = self.root().join("framework.zip");
        fs::write(
            &path,
            zip_bytes(&[("winhttp.dll", "loader"), (plugin.as_str(), "api")]),
        )
        .unwrap();
        path
    }
}

type Hook = Box<dyn Fn(&str) + Send + Sync>;

/// In-memory stand-in for the release host and HTTP downloads
#[derive(Default)]
pub struct FakeRemote {
    releases: HashMap<String, String>,
    texts: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
    interrupted: HashMap<String, Vec<u8>>,
    jitter: bool,
    download_hook: Option<Hook>,
    pub release_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `version` as the latest release of the mod called `name`
    pub fn with_release(mut self, name: &str, version: &str) -> Self {
        self.releases
            .insert(name.replace(' ', ""), version.to_string());
        self
    }

    pub fn with_text(mut self, url: &str, text: &str) -> Self {
        self.texts.insert(url.to_string(), text.to_string());
        self
    }

    pub fn with_file(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(url.to_string(), bytes);
        self
    }

    /// Write `partial` to the destination, then fail as if the connection dropped
    pub fn with_interrupted_file(mut self, url: &str, partial: Vec<u8>) -> Self {
        self.interrupted.insert(url.to_string(), partial);
        self
    }

    /// Serve a mod release archive at the URL `latest_release` reports
    pub fn with_mod_archive(self, record: &ModRecord, version: &str) -> Self {
        let url = Self::release_url(&record.github_repo, version);
        self.with_release(&record.name, version)
            .with_file(&url, mod_zip(record, version))
    }

    /// Vary response times so parallel fetches finish out of order
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    /// Run `hook(url)` at the start of every download
    pub fn with_download_hook(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.download_hook = Some(Box::new(hook));
        self
    }

    pub fn release_url(repo: &str, version: &str) -> String {
        format!("https://example.invalid/{}/{}.zip", repo, version)
    }
}

impl ReleaseSource for FakeRemote {
    fn latest_release(&self, owner: &str, repo: &str) -> Result<ReleaseInfo> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        if self.jitter {
            let delay = repo.bytes().map(u64::from).sum::<u64>() % 7;
            std::thread::sleep(Duration::from_millis(delay));
        }

        let version = self
            .releases
            .get(repo)
            .ok_or_else(|| ModError::remote(format!("{}/{}", owner, repo), "404 Not Found"))?;
        Ok(ReleaseInfo {
            version: version.clone(),
            download_url: Self::release_url(repo, version),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        })
    }
}

impl Transfer for FakeRemote {
    fn get_text(&self, url: &str) -> Result<String> {
        self.texts
            .get(url)
            .cloned()
            .ok_or_else(|| ModError::remote(url, "404 Not Found"))
    }

    fn download(&self, url: &str, dest: &Path, progress: &dyn Fn(f32)) -> Result<()> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = &self.download_hook {
            hook(url);
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| ModError::persistence(parent, e))?;
        }
        if let Some(partial) = self.interrupted.get(url) {
            fs::write(dest, partial).map_err(|e| ModError::persistence(dest, e))?;
            return Err(ModError::remote(url, "connection reset"));
        }

        let bytes = self
            .files
            .get(url)
            .ok_or_else(|| ModError::remote(url, "404 Not Found"))?;
        fs::write(dest, bytes).map_err(|e| ModError::persistence(dest, e))?;
        progress(1.0);
        Ok(())
    }
}
