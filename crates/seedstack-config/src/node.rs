//! Configuration tree model.
//!
//! A configuration tree is made of three kinds of nodes:
//!
//! - [`ConfigNode::Map`]: ordered string-keyed children ([`MapNode`]).
//!   Iteration follows insertion order, lookup is by key.
//! - [`ConfigNode::Array`]: ordered list of children.
//! - [`ConfigNode::Value`]: a scalar leaf, kept as text. Typed access parses
//!   the text on demand (see [`crate::from_node`]).
//!
//! Trees are plain owned data: cloning a node deep-copies it, so two clones
//! never share mutable state.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::path::{ConfigPath, PathSegment};
use crate::{ConfigError, ConfigResult};

/// Ordered mapping of keys to child nodes.
pub type MapNode = IndexMap<String, ConfigNode>;

/// A node of the configuration tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConfigNode {
    /// Named children.
    Map(MapNode),
    /// Positional children.
    Array(Vec<ConfigNode>),
    /// Scalar leaf.
    Value(String),
}

/// The kind of a [`ConfigNode`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A map node.
    Map,
    /// An array node.
    Array,
    /// A value node.
    Value,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Map => f.write_str("map"),
            NodeKind::Array => f.write_str("array"),
            NodeKind::Value => f.write_str("value"),
        }
    }
}

impl Default for ConfigNode {
    fn default() -> Self {
        Self::map()
    }
}

impl ConfigNode {
    /// Creates an empty map node.
    #[must_use]
    pub fn map() -> Self {
        Self::Map(MapNode::new())
    }

    /// Creates a value node.
    pub fn value(text: impl Into<String>) -> Self {
        Self::Value(text.into())
    }

    /// Returns the kind of this node.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            ConfigNode::Map(_) => NodeKind::Map,
            ConfigNode::Array(_) => NodeKind::Array,
            ConfigNode::Value(_) => NodeKind::Value,
        }
    }

    /// Returns the children if this is a map node.
    #[must_use]
    pub fn as_map(&self) -> Option<&MapNode> {
        match self {
            ConfigNode::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the children mutably if this is a map node.
    pub fn as_map_mut(&mut self) -> Option<&mut MapNode> {
        match self {
            ConfigNode::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the elements if this is an array node.
    #[must_use]
    pub fn as_array(&self) -> Option<&[ConfigNode]> {
        match self {
            ConfigNode::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the text if this is a value node.
    #[must_use]
    pub fn as_value(&self) -> Option<&str> {
        match self {
            ConfigNode::Value(text) => Some(text),
            _ => None,
        }
    }

    /// Returns true if this node is a map without children.
    #[must_use]
    pub fn is_empty_map(&self) -> bool {
        matches!(self, ConfigNode::Map(map) if map.is_empty())
    }

    /// Looks up the node at `path`.
    #[must_use]
    pub fn get(&self, path: &ConfigPath) -> Option<&ConfigNode> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| match (node, segment) {
                (ConfigNode::Map(map), PathSegment::Key(key)) => map.get(key),
                (ConfigNode::Array(items), PathSegment::Index(index)) => items.get(*index),
                _ => None,
            })
    }

    /// Looks up the node at `path` mutably.
    pub fn get_mut(&mut self, path: &ConfigPath) -> Option<&mut ConfigNode> {
        let mut node = self;
        for segment in path.segments() {
            node = match (node, segment) {
                (ConfigNode::Map(map), PathSegment::Key(key)) => map.get_mut(key)?,
                (ConfigNode::Array(items), PathSegment::Index(index)) => items.get_mut(*index)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Stores `value` at `path`, creating intermediate maps as needed.
    ///
    /// An intermediate node of the wrong kind is replaced by a map when the
    /// next segment is a key. Index segments must address an existing element
    /// or the position right after the last one (append).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPath` for the root path or an index that
    /// cannot be reached.
    pub fn set(&mut self, path: &ConfigPath, value: ConfigNode) -> ConfigResult<()> {
        let Some((last, parents)) = path.segments().split_last() else {
            return Err(ConfigError::invalid_path(
                path.to_string(),
                "cannot replace the root node",
            ));
        };

        let mut node = self;
        for segment in parents {
            node = node.step_or_create(segment, path)?;
        }

        match last {
            PathSegment::Key(key) => {
                if !matches!(node, ConfigNode::Map(_)) {
                    *node = ConfigNode::map();
                }
                if let ConfigNode::Map(map) = node {
                    map.insert(key.clone(), value);
                }
            }
            PathSegment::Index(index) => {
                let items = match node {
                    ConfigNode::Array(items) => items,
                    _ => {
                        return Err(ConfigError::invalid_path(
                            path.to_string(),
                            "index segment applied to a non-array node",
                        ))
                    }
                };
                if *index < items.len() {
                    items[*index] = value;
                } else if *index == items.len() {
                    items.push(value);
                } else {
                    return Err(ConfigError::invalid_path(
                        path.to_string(),
                        format!("index {index} is out of bounds ({} elements)", items.len()),
                    ));
                }
            }
        }
        Ok(())
    }

    fn step_or_create(
        &mut self,
        segment: &PathSegment,
        path: &ConfigPath,
    ) -> ConfigResult<&mut ConfigNode> {
        match segment {
            PathSegment::Key(key) => {
                if !matches!(self, ConfigNode::Map(_)) {
                    *self = ConfigNode::map();
                }
                let ConfigNode::Map(map) = self else {
                    return Err(ConfigError::invalid_path(path.to_string(), "expected a map"));
                };
                Ok(map.entry(key.clone()).or_default())
            }
            PathSegment::Index(index) => match self {
                ConfigNode::Array(items) if *index <= items.len() => {
                    if *index == items.len() {
                        items.push(ConfigNode::map());
                    }
                    Ok(&mut items[*index])
                }
                _ => Err(ConfigError::invalid_path(
                    path.to_string(),
                    format!("cannot reach index {index}"),
                )),
            },
        }
    }

    /// Removes and returns the node at `path`, preserving sibling order.
    pub fn remove(&mut self, path: &ConfigPath) -> Option<ConfigNode> {
        let (last, parents) = path.segments().split_last()?;
        let parent = self.get_mut(&ConfigPath::from_segments(parents.to_vec()))?;
        match (parent, last) {
            (ConfigNode::Map(map), PathSegment::Key(key)) => map.shift_remove(key),
            (ConfigNode::Array(items), PathSegment::Index(index)) if *index < items.len() => {
                Some(items.remove(*index))
            }
            _ => None,
        }
    }

    /// Deep-merges `other` into this node.
    ///
    /// Maps are merged key by key, recursively. Any other combination
    /// (value over map, map over array, ...) replaces this node with `other`
    /// entirely: the last writer wins at that path. Arrays are never merged
    /// element-wise.
    pub fn merge(&mut self, other: ConfigNode) {
        match (self, other) {
            (ConfigNode::Map(target), ConfigNode::Map(source)) => {
                for (key, value) in source {
                    match target.get_mut(&key) {
                        Some(existing) => existing.merge(value),
                        None => {
                            target.insert(key, value);
                        }
                    }
                }
            }
            (target, source) => *target = source,
        }
    }

    /// Flattens the tree into dotted properties.
    ///
    /// Only value leaves produce entries; empty maps and arrays vanish.
    ///
    /// # Example
    ///
    /// ```
    /// use seedstack_config::{parse_str, Format};
    ///
    /// let node = parse_str(r#"{"a": {"b": 1, "c": [true]}}"#, Format::Json).unwrap();
    /// let flat = node.flatten();
    /// assert_eq!(flat["a.b"], "1");
    /// assert_eq!(flat["a.c[0]"], "true");
    /// ```
    #[must_use]
    pub fn flatten(&self) -> BTreeMap<String, String> {
        let mut properties = BTreeMap::new();
        self.flatten_into(&ConfigPath::root(), &mut properties);
        properties
    }

    fn flatten_into(&self, prefix: &ConfigPath, properties: &mut BTreeMap<String, String>) {
        match self {
            ConfigNode::Map(map) => {
                for (key, child) in map {
                    child.flatten_into(&prefix.child(key.clone()), properties);
                }
            }
            ConfigNode::Array(items) => {
                for (index, child) in items.iter().enumerate() {
                    child.flatten_into(&prefix.index(index), properties);
                }
            }
            ConfigNode::Value(text) => {
                properties.insert(prefix.to_string(), text.clone());
            }
        }
    }
}

impl From<&str> for ConfigNode {
    fn from(text: &str) -> Self {
        Self::Value(text.to_string())
    }
}

impl From<String> for ConfigNode {
    fn from(text: String) -> Self {
        Self::Value(text)
    }
}

impl From<MapNode> for ConfigNode {
    fn from(map: MapNode) -> Self {
        Self::Map(map)
    }
}

impl From<Vec<ConfigNode>> for ConfigNode {
    fn from(items: Vec<ConfigNode>) -> Self {
        Self::Array(items)
    }
}

impl<K: Into<String>> FromIterator<(K, ConfigNode)> for ConfigNode {
    fn from_iter<I: IntoIterator<Item = (K, ConfigNode)>>(iter: I) -> Self {
        Self::Map(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(expression: &str) -> ConfigPath {
        ConfigPath::parse(expression).unwrap()
    }

    fn value<'a>(node: &'a ConfigNode, expression: &str) -> Option<&'a str> {
        node.get(&path(expression)).and_then(ConfigNode::as_value)
    }

    fn sample() -> ConfigNode {
        ConfigNode::from_iter([
            (
                "application",
                ConfigNode::from_iter([
                    ("name", ConfigNode::from("shop")),
                    (
                        "packages",
                        ConfigNode::from(vec![
                            ConfigNode::from("org.a"),
                            ConfigNode::from("org.b"),
                        ]),
                    ),
                ]),
            ),
            ("debug", ConfigNode::from("false")),
        ])
    }

    #[test]
    fn test_get_by_path() {
        let node = sample();
        assert_eq!(value(&node, "application.name"), Some("shop"));
        assert_eq!(value(&node, "application.packages[1]"), Some("org.b"));
        assert!(node.get(&path("application.missing")).is_none());
        assert!(node.get(&path("debug.nested")).is_none());
        assert_eq!(node.get(&ConfigPath::root()), Some(&node));
    }

    #[test]
    fn test_set_creates_intermediate_maps() {
        let mut node = ConfigNode::map();
        node.set(&path("a.b.c"), ConfigNode::from("1")).unwrap();
        assert_eq!(value(&node, "a.b.c"), Some("1"));
    }

    #[test]
    fn test_set_replaces_value_with_map() {
        let mut node = sample();
        node.set(&path("debug.level"), ConfigNode::from("trace")).unwrap();
        assert_eq!(node.get(&path("debug")).map(ConfigNode::kind), Some(NodeKind::Map));
    }

    #[test]
    fn test_set_array_index() {
        let mut node = sample();
        node.set(&path("application.packages[0]"), ConfigNode::from("org.z")).unwrap();
        node.set(&path("application.packages[2]"), ConfigNode::from("org.c")).unwrap();
        assert_eq!(
            node.get(&path("application.packages")).and_then(ConfigNode::as_array).map(<[_]>::len),
            Some(3)
        );
        assert!(node.set(&path("application.packages[9]"), ConfigNode::from("x")).is_err());
        assert!(node.set(&ConfigPath::root(), ConfigNode::map()).is_err());
    }

    #[test]
    fn test_set_through_array_elements() {
        let mut node = ConfigNode::from_iter([(
            "users",
            ConfigNode::from(vec![ConfigNode::from_iter([("name", ConfigNode::from("ann"))])]),
        )]);
        node.set(&path("users[0].role"), ConfigNode::from("admin")).unwrap();
        node.set(&path("users[1].name"), ConfigNode::from("bob")).unwrap();

        assert_eq!(value(&node, "users[0].name"), Some("ann"));
        assert_eq!(value(&node, "users[0].role"), Some("admin"));
        assert_eq!(value(&node, "users[1].name"), Some("bob"));
        assert!(node.set(&path("users[5].name"), ConfigNode::from("x")).is_err());
    }

    #[test]
    fn test_remove_keeps_sibling_order() {
        let mut node = ConfigNode::from_iter([
            ("a", ConfigNode::from("1")),
            ("b", ConfigNode::from("2")),
            ("c", ConfigNode::from("3")),
        ]);
        assert_eq!(node.remove(&path("b")), Some(ConfigNode::from("2")));
        let keys: Vec<_> = node.as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "c"]);
        assert!(node.remove(&path("b")).is_none());
    }

    #[test]
    fn test_merge_is_deep() {
        let mut base = sample();
        let overlay = ConfigNode::from_iter([(
            "application",
            ConfigNode::from_iter([("version", ConfigNode::from("2.0"))]),
        )]);
        base.merge(overlay);
        assert_eq!(value(&base, "application.name"), Some("shop"));
        assert_eq!(value(&base, "application.version"), Some("2.0"));
    }

    #[test]
    fn test_merge_type_conflict_replaces_subtree() {
        let mut base = sample();
        base.merge(ConfigNode::from_iter([("application", ConfigNode::from("disabled"))]));
        assert_eq!(base.get(&path("application")), Some(&ConfigNode::from("disabled")));

        base.merge(ConfigNode::from_iter([(
            "application",
            ConfigNode::from_iter([("name", ConfigNode::from("other"))]),
        )]));
        assert_eq!(value(&base, "application.name"), Some("other"));
        assert!(base.get(&path("application.packages")).is_none());
    }

    #[test]
    fn test_merge_replaces_arrays_wholesale() {
        let mut base = sample();
        base.merge(ConfigNode::from_iter([(
            "application",
            ConfigNode::from_iter([(
                "packages",
                ConfigNode::from(vec![ConfigNode::from("org.c")]),
            )]),
        )]));
        assert_eq!(
            base.get(&path("application.packages")).and_then(ConfigNode::as_array).map(<[_]>::len),
            Some(1)
        );
    }

    #[test]
    fn test_flatten() {
        let flat = sample().flatten();
        assert_eq!(flat.get("application.name").map(String::as_str), Some("shop"));
        assert_eq!(flat.get("application.packages[0]").map(String::as_str), Some("org.a"));
        assert_eq!(flat.get("debug").map(String::as_str), Some("false"));
        assert_eq!(flat.len(), 4);
    }

    #[test]
    fn test_clone_is_deep() {
        let original = sample();
        let mut copy = original.clone();
        copy.set(&path("application.name"), ConfigNode::from("changed")).unwrap();
        assert_eq!(value(&original, "application.name"), Some("shop"));
    }

    #[test]
    fn test_serialize_untagged() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(
            json,
            r#"{"application":{"name":"shop","packages":["org.a","org.b"]},"debug":"false"}"#
        );
    }
}
