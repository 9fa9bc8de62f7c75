//! Removal of keys marked for deletion.
//!
//! A key written with a leading `-` is a removal marker: both the marker and
//! its un-prefixed sibling disappear from the processed tree.
//!
//! ```yaml
//! a: 1
//! b: 2
//! -b: ignored   # removes both "-b" and "b"
//! ```
//!
//! A profile decoration on a marker is ignored: `-b<prod>` removes itself and
//! `b`, whatever the active profiles are.

use std::collections::HashSet;

use tracing::trace;

use crate::node::MapNode;
use crate::processor::{descend, TreeProcessor};
use crate::profile::strip_decoration;

/// Prefix marking a key for removal.
pub const REMOVAL_MARKER: char = '-';

/// Returns the sibling key a removal marker targets, or `None` when `key` is
/// not a removal marker.
///
/// # Example
///
/// ```
/// use seedstack_config::removal_target;
///
/// assert_eq!(removal_target("-cache"), Some("cache"));
/// assert_eq!(removal_target("-cache<prod>"), Some("cache"));
/// assert_eq!(removal_target("cache"), None);
/// ```
#[must_use]
pub fn removal_target(key: &str) -> Option<&str> {
    key.strip_prefix(REMOVAL_MARKER).map(strip_decoration)
}

/// Strips removal markers and their targets from a tree.
///
/// Markers are collected before anything is removed, so the relative order of
/// a marker and its target does not matter. A marker without a target only
/// removes itself. The pass is idempotent.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemovalProcessor;

impl RemovalProcessor {
    /// Creates a removal processor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TreeProcessor for RemovalProcessor {
    fn name(&self) -> &'static str {
        "removal"
    }

    fn process(&self, map: &mut MapNode) {
        let doomed: HashSet<String> = map
            .keys()
            .filter_map(|key| removal_target(key).map(|target| [key.clone(), target.to_string()]))
            .flatten()
            .collect();

        if !doomed.is_empty() {
            trace!(keys = ?doomed, "removing marked configuration keys");
            map.retain(|key, _| !doomed.contains(key));
        }

        for child in map.values_mut() {
            descend(child, self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_str, ConfigNode, Format};

    fn process(yaml: &str) -> ConfigNode {
        let mut node = parse_str(yaml, Format::Yaml).unwrap();
        descend(&mut node, &RemovalProcessor::new());
        node
    }

    fn keys(node: &ConfigNode) -> Vec<String> {
        node.as_map().unwrap().keys().cloned().collect()
    }

    #[test]
    fn test_marker_removes_target_declared_before() {
        let node = process("a: 1\nb: 2\n-b: 2bis\n");
        assert_eq!(keys(&node), vec!["a"]);
    }

    #[test]
    fn test_marker_removes_target_declared_after() {
        let node = process("-b: 2bis\na: 1\nb: 2\n");
        assert_eq!(keys(&node), vec!["a"]);
    }

    #[test]
    fn test_marker_without_target_is_noop() {
        let node = process("a: 1\n-missing: x\n");
        assert_eq!(keys(&node), vec!["a"]);
    }

    #[test]
    fn test_nested_markers() {
        let node = process("outer:\n  keep: 1\n  drop: 2\n  -drop: ~\nother: 3\n");
        let outer = node.as_map().unwrap().get("outer").unwrap();
        assert_eq!(keys(outer), vec!["keep"]);
        assert_eq!(keys(&node), vec!["outer", "other"]);
    }

    #[test]
    fn test_marker_removes_whole_subtree() {
        let node = process("db:\n  url: x\n  -url: ~\n-db: ~\n");
        assert!(node.as_map().unwrap().is_empty());
    }

    #[test]
    fn test_markers_inside_arrays() {
        let node = process("items:\n  - a: 1\n    -a: ~\n    b: 2\n");
        let item = &node.as_map().unwrap()["items"].as_array().unwrap()[0];
        assert_eq!(keys(item), vec!["b"]);
    }

    #[test]
    fn test_decorated_marker_ignores_profiles() {
        let node = process("b: 2\nb<prod>: 3\n-b<prod>: ~\n");
        assert_eq!(keys(&node), vec!["b<prod>"]);
    }

    #[test]
    fn test_idempotent() {
        let once = process("a: 1\nb: {c: 1, -c: 2, d: 3}\n-a: x\n");
        let mut twice = once.clone();
        descend(&mut twice, &RemovalProcessor::new());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_values_untouched() {
        let node = process("a: -value\nb: '-b'\n");
        assert_eq!(keys(&node), vec!["a", "b"]);
    }
}
