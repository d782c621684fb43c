//! Version comparison for release tags
//!
//! Tags are dot-separated non-negative integers, optionally preceded by a
//! non-numeric tag such as `v` or `release-`. Missing trailing components
//! compare as zero, so `1.2` and `1.2.0` are the same version.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{ModError, Result};

#[derive(Debug, Clone, Eq)]
pub struct Version {
    parts: Vec<u64>,
}

impl Version {
    pub fn parse(raw: &str) -> Result<Self> {
        let malformed = || ModError::MalformedVersion {
            version: raw.to_string(),
        };

        let trimmed = raw.trim();
        let numeric = trimmed
            .find(|c: char| c.is_ascii_digit())
            .map(|start| &trimmed[start..])
            .ok_or_else(malformed)?;

        let parts = numeric
            .split('.')
            .map(|part| part.parse::<u64>().map_err(|_| malformed()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { parts })
    }
}

impl FromStr for Version {
    type Err = ModError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .parts
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        f.write_str(&joined)
    }
}

/// Compare two version strings
pub fn compare(a: &str, b: &str) -> Result<Ordering> {
    Ok(Version::parse(a)?.cmp(&Version::parse(b)?))
}

/// True iff `remote` is strictly newer than `local`.
///
/// A malformed version on either side means no update is offered.
pub fn is_newer(remote: &str, local: &str) -> bool {
    match compare(remote, local) {
        Ok(ordering) => ordering == Ordering::Greater,
        Err(e) => {
            crate::logging::log_warning(&format!(
                "Cannot compare versions '{}' and '{}': {}",
                remote, local, e
            ));
            false
        }
    }
}

/// Normalize a release tag into the form stored in the catalog (`v1.2.0` -> `1.2.0`)
pub fn clean_tag(tag: &str) -> String {
    Version::parse(tag)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| tag.trim().to_string())
}
