//! Priority-ordered merging of named configuration sources.
//!
//! Each source is registered under a unique name with an `i32` priority. The
//! merged view is built by deep-merging the sources in ascending priority
//! order, so a higher priority overrides a lower one leaf by leaf.
//!
//! ```text
//!  priority  -1000        0             1000          i32::MAX
//!          defaults → files      → environment → runtime values
//!                            deep merge, last writer wins
//! ```

use std::collections::HashMap;

use tracing::debug;

use crate::node::ConfigNode;

#[derive(Debug, Clone)]
struct RegisteredSource {
    node: ConfigNode,
    priority: i32,
    sequence: u64,
}

/// Merges named sources by priority.
///
/// Sources with equal priority are merged in registration order (the later
/// registration wins). Re-registering a name discards its previous tree and
/// counts as a new registration.
///
/// # Example
///
/// ```
/// use seedstack_config::{ConfigNode, ConfigPath, PriorityMergeProvider};
///
/// let mut provider = PriorityMergeProvider::new();
/// provider.register("defaults", ConfigNode::from_iter([("key", ConfigNode::from("A"))]), 0);
/// provider.register("overrides", ConfigNode::from_iter([("key", ConfigNode::from("B"))]), 1000);
///
/// let key = ConfigPath::parse("key").unwrap();
/// assert_eq!(provider.provide().get(&key).and_then(ConfigNode::as_value), Some("B"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PriorityMergeProvider {
    sources: HashMap<String, RegisteredSource>,
    next_sequence: u64,
    merged: ConfigNode,
}

impl PriorityMergeProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `node` under `name` and re-merges.
    ///
    /// Returns the tree previously registered under that name, if any.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        node: ConfigNode,
        priority: i32,
    ) -> Option<ConfigNode> {
        let name = name.into();
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        debug!(source = %name, priority, "registering configuration source");
        let previous = self
            .sources
            .insert(
                name,
                RegisteredSource {
                    node,
                    priority,
                    sequence,
                },
            )
            .map(|source| source.node);
        self.remerge();
        previous
    }

    /// Removes the source registered under `name` and re-merges.
    pub fn unregister(&mut self, name: &str) -> Option<ConfigNode> {
        let removed = self.sources.remove(name).map(|source| source.node);
        if removed.is_some() {
            debug!(source = %name, "unregistered configuration source");
            self.remerge();
        }
        removed
    }

    /// Returns the merged view of all sources.
    #[must_use]
    pub fn provide(&self) -> &ConfigNode {
        &self.merged
    }

    /// Returns the tree registered under `name`.
    #[must_use]
    pub fn source(&self, name: &str) -> Option<&ConfigNode> {
        self.sources.get(name).map(|source| &source.node)
    }

    /// Returns the priority of the source registered under `name`.
    #[must_use]
    pub fn priority_of(&self, name: &str) -> Option<i32> {
        self.sources.get(name).map(|source| source.priority)
    }

    /// Returns true if a source is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns true when no source is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Source names in merge order (lowest precedence first).
    #[must_use]
    pub fn source_names(&self) -> Vec<&str> {
        self.ordered().into_iter().map(|(name, _)| name).collect()
    }

    fn ordered(&self) -> Vec<(&str, &RegisteredSource)> {
        let mut ordered: Vec<(&str, &RegisteredSource)> = self
            .sources
            .iter()
            .map(|(name, source)| (name.as_str(), source))
            .collect();
        ordered.sort_by_key(|(_, source)| (source.priority, source.sequence));
        ordered
    }

    fn remerge(&mut self) {
        let mut merged = ConfigNode::map();
        for (_, source) in self.ordered() {
            merged.merge(source.node.clone());
        }
        debug!(sources = self.sources.len(), "merged configuration sources");
        self.merged = merged;
    }
}
