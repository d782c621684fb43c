//! Local catalog persistence

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ModError, Result};
use crate::logging::log_info;

/// A JSON file holding one ordered catalog, rewritten in full on every save
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the catalog. A missing file is the first-run state and yields an empty list.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log_info(&format!(
                    "No local catalog at {}, starting empty",
                    self.path.display()
                ));
                return Ok(Vec::new());
            }
            Err(e) => return Err(ModError::persistence(&self.path, e)),
        };

        let records: Vec<T> = serde_json::from_str(&content)
            .map_err(|e| ModError::persistence(&self.path, e.into()))?;
        log_info(&format!(
            "Loaded {} local entries from {}",
            records.len(),
            self.path.display()
        ));
        Ok(records)
    }

    /// Serialize the whole catalog, replacing any previous file.
    ///
    /// Goes through a sibling `.json.tmp` file that is renamed into place.
    pub fn save<T: Serialize>(&self, records: &[T]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ModError::persistence(parent, e))?;
        }

        let json = serde_json::to_string_pretty(records)
            .map_err(|e| ModError::persistence(&self.path, e.into()))?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|e| ModError::persistence(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| ModError::persistence(&self.path, e))
    }
}
