//! Handler units and their registry.
//!
//! A [`HandlerUnit`] is the compile-time replacement for loading handler
//! code from disk at runtime: a unit exposes its named operations, and
//! units are registered in a [`UnitRegistry`] under the names that unit
//! manifests in the handlers tree refer to. Discovery resolves manifests
//! against the registry at startup; an unresolvable name is a hard error.

use std::collections::HashMap;
use std::sync::Arc;

use palisade_core::BoxHandler;

/// A handler unit: a named bundle of operations.
///
/// Operation names are free-form. Names matching HTTP method tokens are
/// treated as route verbs during binding; everything else is bound as an
/// auxiliary export under its own name.
pub trait HandlerUnit: Send + Sync {
    /// The operations this unit exports, as `(name, handler)` pairs.
    fn operations(&self) -> Vec<(String, BoxHandler)>;
}

/// A [`HandlerUnit`] assembled from individual handlers.
///
/// # Example
///
/// ```rust
/// use palisade_core::{handler_fn, Next, Request, ResponseHandle};
/// use palisade_discovery::OperationSet;
///
/// let unit = OperationSet::new()
///     .operation("get", handler_fn(|_req: Request, res: ResponseHandle, _next: Next| async move {
///         res.send("[]")?;
///         Ok(())
///     }));
/// ```
#[derive(Default, Clone)]
pub struct OperationSet {
    operations: Vec<(String, BoxHandler)>,
}

impl OperationSet {
    /// Creates an empty operation set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named operation.
    #[must_use]
    pub fn operation(mut self, name: impl Into<String>, handler: BoxHandler) -> Self {
        self.operations.push((name.into(), handler));
        self
    }
}

impl HandlerUnit for OperationSet {
    fn operations(&self) -> Vec<(String, BoxHandler)> {
        self.operations.clone()
    }
}

impl std::fmt::Debug for OperationSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.operations.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("OperationSet")
            .field("operations", &names)
            .finish()
    }
}

/// Registry of handler units, keyed by unit name.
///
/// Populated once at startup; read-only afterwards.
#[derive(Default)]
pub struct UnitRegistry {
    units: HashMap<String, Arc<dyn HandlerUnit>>,
}

impl UnitRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a unit under the given name.
    ///
    /// Registering the same name twice replaces the earlier unit.
    pub fn register(&mut self, name: impl Into<String>, unit: impl HandlerUnit + 'static) {
        self.units.insert(name.into(), Arc::new(unit));
    }

    /// Looks up a unit by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn HandlerUnit>> {
        self.units.get(name)
    }

    /// Returns `true` if a unit is registered under the name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    /// Returns the number of registered units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns `true` if no units are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Iterates over registered unit names.
    pub fn unit_names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitRegistry")
            .field("units", &self.units.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_core::{handler_fn, Next, Request, ResponseHandle};

    fn noop_handler() -> BoxHandler {
        handler_fn(|_req: Request, _res: ResponseHandle, _next: Next| async { Ok(()) })
    }

    #[test]
    fn test_registry_register_and_get() {
        let mut registry = UnitRegistry::new();
        assert!(registry.is_empty());

        registry.register("users", OperationSet::new().operation("get", noop_handler()));

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("users"));
        assert!(registry.get("users").is_some());
        assert!(registry.get("ghosts").is_none());
    }

    #[test]
    fn test_registry_replaces_on_reregister() {
        let mut registry = UnitRegistry::new();
        registry.register("users", OperationSet::new());
        registry.register(
            "users",
            OperationSet::new().operation("get", noop_handler()),
        );

        assert_eq!(registry.len(), 1);
        let ops = registry.get("users").unwrap().operations();
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn test_operation_set_preserves_names() {
        let unit = OperationSet::new()
            .operation("get", noop_handler())
            .operation("helper", noop_handler());

        let names: Vec<String> = unit.operations().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["get", "helper"]);
    }

    #[test]
    fn test_registry_unit_names() {
        let mut registry = UnitRegistry::new();
        registry.register("a", OperationSet::new());
        registry.register("b", OperationSet::new());

        let mut names: Vec<&str> = registry.unit_names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["a", "b"]);
    }
}
