//! The bound handler tree.
//!
//! Discovery produces a [`HandlerMap`] whose nesting mirrors the
//! directory tree: a manifest becomes a [`HandlerGroup`] (operations
//! keyed by normalized name), a subdirectory becomes a nested map. The
//! map is read-only after startup; lookups need no synchronization.

use std::collections::HashMap;

use http::Method;

use palisade_core::BoxHandler;

use crate::method::{method_key, METHOD_MARKER};

/// Operations bound for one mapping key, keyed by normalized name.
#[derive(Default, Clone)]
pub struct HandlerGroup {
    operations: HashMap<String, BoxHandler>,
}

impl HandlerGroup {
    /// Creates an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an operation under its (already normalized) name.
    pub fn insert(&mut self, name: impl Into<String>, handler: BoxHandler) {
        self.operations.insert(name.into(), handler);
    }

    /// Looks up an operation by normalized name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BoxHandler> {
        self.operations.get(name)
    }

    /// Looks up the route verb bound for an HTTP method.
    #[must_use]
    pub fn get_method(&self, method: &Method) -> Option<&BoxHandler> {
        self.operations.get(&method_key(method))
    }

    /// Returns `true` if an operation is bound under the name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Returns the number of bound operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns `true` if no operations are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Iterates over bound operation names.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    /// Returns the HTTP methods this group has route verbs for.
    ///
    /// Used to build the `Allow` header on method-not-allowed responses.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self
            .operations
            .keys()
            .filter_map(|name| name.strip_prefix(METHOD_MARKER))
            .filter_map(|token| Method::from_bytes(token.to_ascii_uppercase().as_bytes()).ok())
            .collect();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods
    }
}

impl std::fmt::Debug for HandlerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerGroup")
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// One entry in a [`HandlerMap`]: either a group of bound operations (from
/// a manifest) or a nested map (from a subdirectory).
#[derive(Debug, Clone)]
pub enum HandlerNode {
    /// Bound operations for this key.
    Group(HandlerGroup),
    /// A nested map for a subdirectory.
    Nested(HandlerMap),
}

impl HandlerNode {
    /// Returns `true` if this node is a group.
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    /// Returns the group, if this node is one.
    #[must_use]
    pub fn as_group(&self) -> Option<&HandlerGroup> {
        match self {
            Self::Group(group) => Some(group),
            Self::Nested(_) => None,
        }
    }

    /// Returns the nested map, if this node is one.
    #[must_use]
    pub fn as_nested(&self) -> Option<&HandlerMap> {
        match self {
            Self::Group(_) => None,
            Self::Nested(map) => Some(map),
        }
    }
}

/// A nested mapping from path-derived keys to handler nodes.
#[derive(Debug, Default, Clone)]
pub struct HandlerMap {
    entries: HashMap<String, HandlerNode>,
}

impl HandlerMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node under a key, replacing any earlier node.
    pub fn insert(&mut self, key: impl Into<String>, node: HandlerNode) {
        self.entries.insert(key.into(), node);
    }

    /// Looks up a node by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&HandlerNode> {
        self.entries.get(key)
    }

    /// Returns a mutable reference to the node under a key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut HandlerNode> {
        self.entries.get_mut(key)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the keys at this level.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Resolves a path, segment by segment, to a handler group.
    ///
    /// All leading segments must name nested maps and the final segment
    /// must name a group; anything else, including an empty segment
    /// list, is a miss.
    ///
    /// # Example
    ///
    /// ```rust
    /// use palisade_discovery::{HandlerGroup, HandlerMap, HandlerNode};
    ///
    /// let mut inner = HandlerMap::new();
    /// inner.insert("users", HandlerNode::Group(HandlerGroup::new()));
    /// let mut map = HandlerMap::new();
    /// map.insert("admin", HandlerNode::Nested(inner));
    ///
    /// assert!(map.resolve(&["admin", "users"]).is_some());
    /// assert!(map.resolve(&["admin"]).is_none());
    /// assert!(map.resolve(&["users"]).is_none());
    /// ```
    #[must_use]
    pub fn resolve(&self, segments: &[&str]) -> Option<&HandlerGroup> {
        let (last, dirs) = segments.split_last()?;
        let mut current = self;
        for segment in dirs {
            current = current.get(segment)?.as_nested()?;
        }
        current.get(last)?.as_group()
    }
}
