//! Source registry and resolution pipeline.
//!
//! ```text
//!  raw source ──► RemovalProcessor ──► ProfileProcessor ──┐
//!  raw source ──► RemovalProcessor ──► ProfileProcessor ──┼──► PriorityMergeProvider ──► Config
//!  raw source ──► RemovalProcessor ──► ProfileProcessor ──┘
//! ```
//!
//! Raw trees are kept untouched so that a profile change or a fork can replay
//! the pipeline from scratch.

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info, trace};

use crate::config::Config;
use crate::node::ConfigNode;
use crate::processor::{descend, TreeProcessor};
use crate::profile::{ActiveProfiles, ProfileProcessor};
use crate::provider::PriorityMergeProvider;
use crate::removal::RemovalProcessor;
use crate::source::ConfigSource;
use crate::{ConfigError, ConfigResult};

#[derive(Debug, Clone)]
struct RawSource {
    node: ConfigNode,
    priority: i32,
    origin: Option<Arc<dyn ConfigSource>>,
}

/// Owns the raw sources, the active profiles and the merged view.
///
/// # Example
///
/// ```
/// use seedstack_config::{ActiveProfiles, ConfigResolver, Format, parse_str};
///
/// let mut resolver = ConfigResolver::new(ActiveProfiles::parse("prod"));
/// resolver.register(
///     "application.yaml",
///     parse_str("url<dev>: h2\nurl<prod>: postgres\n", Format::Yaml).unwrap(),
///     0,
/// );
/// assert_eq!(resolver.resolve().get_str("url"), Some("postgres"));
///
/// resolver.set_profiles(ActiveProfiles::parse("dev"));
/// assert_eq!(resolver.resolve().get_str("url"), Some("h2"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    sources: IndexMap<String, RawSource>,
    profiles: ActiveProfiles,
    provider: PriorityMergeProvider,
}

impl ConfigResolver {
    /// Creates an empty resolver for the given profiles.
    #[must_use]
    pub fn new(profiles: ActiveProfiles) -> Self {
        Self {
            profiles,
            ..Self::default()
        }
    }

    /// Runs removal then profile filtering over a copy of `node`.
    #[must_use]
    pub fn process(&self, node: &ConfigNode) -> ConfigNode {
        let removal = RemovalProcessor::new();
        let profile = ProfileProcessor::new(self.profiles.clone());
        let pipeline: [&dyn TreeProcessor; 2] = [&removal, &profile];

        let mut processed = node.clone();
        for processor in pipeline {
            trace!(processor = processor.name(), "applying configuration processor");
            descend(&mut processed, processor);
        }
        processed
    }

    /// Registers a raw tree under `name`.
    ///
    /// Replaces any source with the same name. Returns the previous raw tree.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        node: ConfigNode,
        priority: i32,
    ) -> Option<ConfigNode> {
        self.insert(name.into(), node, priority, None)
    }

    /// Loads `source` and registers its tree under the source name.
    ///
    /// # Errors
    ///
    /// Returns the loading error, or [`ConfigError::InvalidConfig`] when the
    /// source root is not a map; the resolver is left unchanged.
    pub fn register_source(&mut self, source: Arc<dyn ConfigSource>) -> ConfigResult<()> {
        let node = source.load_tree()?;
        let name = source.name().to_string();
        let priority = source.priority();
        self.insert(name, node, priority, Some(source));
        Ok(())
    }

    /// Removes the source registered under `name`.
    pub fn unregister(&mut self, name: &str) -> Option<ConfigNode> {
        let removed = self.sources.shift_remove(name)?;
        self.provider.unregister(name);
        Some(removed.node)
    }

    /// Reloads a source from its origin and re-registers it.
    ///
    /// Sources registered from a bare tree have nothing to reload from and
    /// are left as they are.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownSource`] when no source has that name,
    /// the loading error, or [`ConfigError::InvalidConfig`] when the new root
    /// is not a map. On error the previous tree stays in effect.
    pub fn reload(&mut self, name: &str) -> ConfigResult<()> {
        let raw = self
            .sources
            .get(name)
            .ok_or_else(|| ConfigError::unknown_source(name))?;
        let Some(origin) = raw.origin.clone() else {
            debug!(source = %name, "source has no origin to reload from");
            return Ok(());
        };
        let node = origin.load_tree()?;
        self.insert(name.to_string(), node, origin.priority(), Some(origin));
        info!(source = %name, "reloaded configuration source");
        Ok(())
    }

    /// Replaces the active profiles and re-processes every source.
    pub fn set_profiles(&mut self, profiles: ActiveProfiles) {
        self.profiles = profiles;
        let mut provider = PriorityMergeProvider::new();
        for (name, raw) in &self.sources {
            provider.register(name.clone(), self.process(&raw.node), raw.priority);
        }
        self.provider = provider;
        info!(profiles = %self.profiles, sources = self.sources.len(), "re-applied profiles");
    }

    /// The active profiles.
    #[must_use]
    pub fn profiles(&self) -> &ActiveProfiles {
        &self.profiles
    }

    /// Snapshot of the merged configuration.
    #[must_use]
    pub fn resolve(&self) -> Config {
        debug!(
            profiles = %self.profiles,
            sources = self.sources.len(),
            "resolved configuration"
        );
        Config::new(self.provider.provide().clone(), self.profiles.clone())
    }

    /// An independent resolver over deep copies of every raw tree.
    #[must_use]
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// Source names in merge order (lowest precedence first).
    #[must_use]
    pub fn source_names(&self) -> Vec<&str> {
        self.provider.source_names()
    }

    /// The raw tree registered under `name`, before processing.
    #[must_use]
    pub fn raw(&self, name: &str) -> Option<&ConfigNode> {
        self.sources.get(name).map(|raw| &raw.node)
    }

    /// Priority of the source registered under `name`.
    #[must_use]
    pub fn priority_of(&self, name: &str) -> Option<i32> {
        self.sources.get(name).map(|raw| raw.priority)
    }

    /// File-backed sources as `(name, path)` pairs.
    #[must_use]
    pub fn watched_paths(&self) -> Vec<(String, PathBuf)> {
        self.sources
            .iter()
            .filter_map(|(name, raw)| {
                let path = raw.origin.as_ref()?.path()?;
                Some((name.clone(), path.to_path_buf()))
            })
            .collect()
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

    fn insert(
        &mut self,
        name: String,
        node: ConfigNode,
        priority: i32,
        origin: Option<Arc<dyn ConfigSource>>,
    ) -> Option<ConfigNode> {
        let processed = self.process(&node);
        debug!(
            source = %name,
            priority,
            profiles = %self.profiles,
            "processed configuration source"
        );

        // Re-registration moves the source last so that a replay keeps the
        // provider's tie-breaking order.
        let previous = self.sources.shift_remove(&name).map(|raw| raw.node);
        self.sources.insert(
            name.clone(),
            RawSource {
                node,
                priority,
                origin,
            },
        );
        self.provider.register(name, processed, priority);
        previous
    }
}
