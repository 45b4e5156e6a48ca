//! Unit manifests.
//!
//! A unit manifest is a `*.unit.toml` file in the handlers tree. The file
//! stem (suffix stripped) becomes the mapping key; the optional `unit`
//! field names the registered [`HandlerUnit`](crate::HandlerUnit) to bind
//! there, defaulting to the stem itself.
//!
//! ```toml
//! # users.unit.toml
//! unit = "users-v2"
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::discover::DiscoveryError;

/// File suffix identifying a unit manifest.
pub const MANIFEST_SUFFIX: &str = ".unit.toml";

/// Parsed contents of a unit manifest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitManifest {
    /// Registered unit name; defaults to the manifest's file stem.
    pub unit: Option<String>,
}

impl UnitManifest {
    /// Reads and parses a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Io`] if the file cannot be read and
    /// [`DiscoveryError::Manifest`] if it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, DiscoveryError> {
        let raw = std::fs::read_to_string(path).map_err(|source| DiscoveryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|err| DiscoveryError::Manifest {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Resolves the unit name, falling back to the file stem.
    #[must_use]
    pub fn unit_name<'a>(&'a self, stem: &'a str) -> &'a str {
        self.unit.as_deref().unwrap_or(stem)
    }
}

/// Strips the manifest suffix from a file name, returning the mapping key.
///
/// Returns `None` for files that are not unit manifests.
#[must_use]
pub fn manifest_stem(file_name: &str) -> Option<&str> {
    file_name.strip_suffix(MANIFEST_SUFFIX)
}
