//! Directory-tree discovery.
//!
//! [`discover`] walks a handlers directory, binds each unit manifest it
//! finds, and recurses into subdirectories, producing a [`HandlerMap`]
//! whose nesting mirrors the tree. Every bound operation is passed
//! through the supplied wrapper on its way into the map; this is where
//! the fault-isolation boundary is applied, uniformly over route verbs
//! and helper exports.
//!
//! Children are visited in whatever order the directory listing yields
//! them. If a manifest and a subdirectory share a base name, the
//! later-visited entry silently overwrites the earlier one; that order is
//! platform-dependent and intentionally left unspecified.

use std::path::{Path, PathBuf};

use thiserror::Error;

use palisade_core::BoxHandler;

use crate::manifest::{manifest_stem, UnitManifest};
use crate::method::normalize_operation;
use crate::tree::{HandlerGroup, HandlerMap, HandlerNode};
use crate::unit::UnitRegistry;

/// Errors produced during discovery. All of these abort startup; no
/// partial map is ever returned.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The handlers root directory does not exist.
    #[error("handlers directory does not exist: {0}")]
    RootNotFound(PathBuf),

    /// An I/O error while reading the tree.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A manifest file could not be parsed.
    #[error("invalid unit manifest {path}: {message}")]
    Manifest {
        /// Manifest path.
        path: PathBuf,
        /// Parse failure detail.
        message: String,
    },

    /// A manifest names a unit that is not registered.
    #[error("manifest {path} names unregistered unit '{unit}'")]
    UnknownUnit {
        /// Manifest path.
        path: PathBuf,
        /// The unresolvable unit name.
        unit: String,
    },
}

/// Input to [`discover`]: a directory to walk, or an already-built map.
#[derive(Debug)]
pub enum HandlerSource {
    /// Root directory of a handlers tree.
    Path(PathBuf),
    /// A pre-built map; returned unchanged.
    Map(HandlerMap),
}

impl From<PathBuf> for HandlerSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for HandlerSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for HandlerSource {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<HandlerMap> for HandlerSource {
    fn from(map: HandlerMap) -> Self {
        Self::Map(map)
    }
}

/// Discovers and binds the handler tree under `source`.
///
/// A [`HandlerSource::Map`] input is returned unchanged; discovery is
/// idempotent over already-resolved trees. A path input must be an
/// existing directory; otherwise discovery fails before producing
/// anything.
///
/// # Errors
///
/// See [`DiscoveryError`]; every variant is startup-fatal.
///
/// # Example
///
/// ```rust,no_run
/// use palisade_discovery::{discover, UnitRegistry};
///
/// let registry = UnitRegistry::new();
/// let map = discover("api/handlers", &registry, &|handler| handler)?;
/// # Ok::<(), palisade_discovery::DiscoveryError>(())
/// ```
pub fn discover(
    source: impl Into<HandlerSource>,
    registry: &UnitRegistry,
    wrap: &dyn Fn(BoxHandler) -> BoxHandler,
) -> Result<HandlerMap, DiscoveryError> {
    match source.into() {
        HandlerSource::Map(map) => Ok(map),
        HandlerSource::Path(root) => {
            if !root.is_dir() {
                return Err(DiscoveryError::RootNotFound(root));
            }
            read_tree(&root, registry, wrap)
        }
    }
}

fn read_tree(
    dir: &Path,
    registry: &UnitRegistry,
    wrap: &dyn Fn(BoxHandler) -> BoxHandler,
) -> Result<HandlerMap, DiscoveryError> {
    let mut map = HandlerMap::new();

    let entries = std::fs::read_dir(dir).map_err(|source| DiscoveryError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| DiscoveryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();

        if path.is_dir() {
            let name = entry.file_name().to_string_lossy().into_owned();
            let nested = read_tree(&path, registry, wrap)?;
            map.insert(name, HandlerNode::Nested(nested));
            continue;
        }

        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        let Some(stem) = manifest_stem(&file_name) else {
            // Not a unit manifest; irrelevant to discovery.
            continue;
        };

        let group = bind_manifest(&path, stem, registry, wrap)?;
        tracing::debug!(
            key = %stem,
            operations = group.len(),
            "bound handler unit"
        );
        map.insert(stem.to_string(), HandlerNode::Group(group));
    }

    Ok(map)
}

fn bind_manifest(
    path: &Path,
    stem: &str,
    registry: &UnitRegistry,
    wrap: &dyn Fn(BoxHandler) -> BoxHandler,
) -> Result<HandlerGroup, DiscoveryError> {
    let manifest = UnitManifest::load(path)?;
    let unit_name = manifest.unit_name(stem);

    let unit = registry
        .get(unit_name)
        .ok_or_else(|| DiscoveryError::UnknownUnit {
            path: path.to_path_buf(),
            unit: unit_name.to_string(),
        })?;

    let mut group = HandlerGroup::new();
    for (name, handler) in unit.operations() {
        group.insert(normalize_operation(&name), wrap(handler));
    }
    Ok(group)
}
