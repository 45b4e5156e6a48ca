//! Handler discovery and binding.
//!
//! This crate walks a directory tree of unit manifests and assembles the
//! nested routing map the host serves from. Each manifest names a
//! [`HandlerUnit`] registered in a [`UnitRegistry`]; every operation a
//! unit exports is wrapped (uniformly: route verbs and helper exports
//! alike) and stored under its normalized name.
//!
//! # Layout convention
//!
//! ```text
//! handlers/
//! ├── users.unit.toml        -> map["users"] is a group
//! └── admin/
//!     └── reports.unit.toml  -> map["admin"]["reports"] is a group
//! ```
//!
//! Operation names that match an HTTP method token case-insensitively are
//! normalized to `$` + the lowercase token (`GET` -> `$get`); all other
//! names pass through unchanged, so units can export helper operations
//! alongside route verbs.

pub mod discover;
pub mod manifest;
pub mod method;
pub mod tree;
pub mod unit;

pub use discover::{discover, DiscoveryError, HandlerSource};
pub use manifest::{UnitManifest, MANIFEST_SUFFIX};
pub use method::{is_http_method, method_key, normalize_operation, METHOD_MARKER};
pub use tree::{HandlerGroup, HandlerMap, HandlerNode};
pub use unit::{HandlerUnit, OperationSet, UnitRegistry};
