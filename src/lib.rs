//! ModHaven - Blasphemous Mod Manager
//!
//! Library crate for the catalog, version and install logic shared by the
//! command-line front end. Network clients are behind the `net` feature.

pub mod catalog;
pub mod config;
pub mod error;
pub mod games;
pub mod installers;
pub mod logging;
pub mod manager;
pub mod paths;
pub mod registry;
pub mod remote;
pub mod skins;
pub mod version;

#[cfg(feature = "net")]
pub mod github;
#[cfg(feature = "net")]
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ModError, Result};
