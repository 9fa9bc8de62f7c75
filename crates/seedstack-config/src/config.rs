//! The resolved configuration.
//!
//! A [`Config`] is the read-only result of the pipeline: every source has been
//! cleaned of removal markers, filtered by profile and merged by priority.
//! It is cheap to clone and can be shared across threads.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::de::from_node;
use crate::node::ConfigNode;
use crate::path::ConfigPath;
use crate::profile::ActiveProfiles;
use crate::{ConfigError, ConfigResult};

/// A typed view of a configuration subtree.
///
/// # Example
///
/// ```
/// use seedstack_config::{Config, ConfigNode, ConfigSection, ActiveProfiles, parse_str, Format};
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// struct Datasource {
///     url: String,
///     #[serde(default)]
///     pool_size: u32,
/// }
///
/// impl ConfigSection for Datasource {
///     const PATH: &'static str = "datasource";
/// }
///
/// let root = parse_str("datasource:\n  url: jdbc:h2:mem\n", Format::Yaml).unwrap();
/// let config = Config::new(root, ActiveProfiles::none());
/// let datasource: Datasource = config.section().unwrap();
/// assert_eq!(datasource.url, "jdbc:h2:mem");
/// assert_eq!(datasource.pool_size, 0);
/// ```
pub trait ConfigSection: DeserializeOwned {
    /// Path of the subtree this section binds to.
    const PATH: &'static str;
}

/// Resolved, immutable configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    root: Arc<ConfigNode>,
    profiles: ActiveProfiles,
}

impl Config {
    /// Wraps a resolved tree.
    #[must_use]
    pub fn new(root: ConfigNode, profiles: ActiveProfiles) -> Self {
        Self {
            root: Arc::new(root),
            profiles,
        }
    }

    /// An empty configuration with no active profile.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The merged tree.
    #[must_use]
    pub fn root(&self) -> &ConfigNode {
        &self.root
    }

    /// The profiles this configuration was resolved with.
    #[must_use]
    pub fn profiles(&self) -> &ActiveProfiles {
        &self.profiles
    }

    /// Returns the node at `path`, or `None` when absent or malformed.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&ConfigNode> {
        let path = ConfigPath::parse(path).ok()?;
        self.root.get(&path)
    }

    /// Returns the node at a parsed path.
    #[must_use]
    pub fn node(&self, path: &ConfigPath) -> Option<&ConfigNode> {
        self.root.get(path)
    }

    /// Returns true if a node exists at `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Returns the text of the leaf at `path`.
    #[must_use]
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(ConfigNode::as_value)
    }

    /// Binds the subtree at `path` to `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPath`] for a malformed path,
    /// [`ConfigError::MissingPath`] when nothing is configured there and
    /// [`ConfigError::InvalidValue`] when the subtree does not fit `T`.
    ///
    /// # Example
    ///
    /// ```
    /// use seedstack_config::{ActiveProfiles, Config, Format, parse_str};
    ///
    /// let root = parse_str("server:\n  port: '8080'\n", Format::Yaml).unwrap();
    /// let config = Config::new(root, ActiveProfiles::none());
    /// assert_eq!(config.get_as::<u16>("server.port").unwrap(), 8080);
    /// assert!(config.get_as::<u16>("server.host").is_err());
    /// ```
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> ConfigResult<T> {
        let parsed = ConfigPath::parse(path)?;
        let node = self
            .root
            .get(&parsed)
            .ok_or_else(|| ConfigError::missing_path(path))?;
        from_node(node).map_err(|e| ConfigError::invalid_value(path, e.to_string()))
    }

    /// Binds the subtree at `path` to `T`, falling back to `default` when
    /// nothing is configured there.
    ///
    /// # Errors
    ///
    /// Returns an error when the path is malformed or the configured value
    /// does not fit `T`.
    pub fn get_or<T: DeserializeOwned>(&self, path: &str, default: T) -> ConfigResult<T> {
        match self.get_as(path) {
            Err(ConfigError::MissingPath { .. }) => Ok(default),
            other => other,
        }
    }

    /// Binds the section registered at `S::PATH`.
    ///
    /// A missing subtree binds as an empty map, so sections made only of
    /// defaulted fields always succeed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when the subtree does not fit.
    pub fn section<S: ConfigSection>(&self) -> ConfigResult<S> {
        let path = ConfigPath::parse(S::PATH)?;
        let empty = ConfigNode::map();
        let node = self.root.get(&path).unwrap_or(&empty);
        from_node(node).map_err(|e| ConfigError::invalid_value(S::PATH, e.to_string()))
    }

    /// Dotted properties view of every leaf.
    #[must_use]
    pub fn flatten(&self) -> BTreeMap<String, String> {
        self.root.flatten()
    }

    /// Dotted names of every leaf, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.flatten().into_keys().collect()
    }

    /// Deep copy sharing nothing with `self`.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            root: Arc::new(ConfigNode::clone(&self.root)),
            profiles: self.profiles.clone(),
        }
    }

    /// Renders the merged tree as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::JsonError`] if serialization fails.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self.root.as_ref())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_str, Format};
    use serde::Deserialize;

    fn config(yaml: &str) -> Config {
        Config::new(parse_str(yaml, Format::Yaml).unwrap(), ActiveProfiles::parse("dev"))
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Cache {
        #[serde(default = "default_ttl")]
        ttl: u64,
        #[serde(default)]
        regions: Vec<String>,
    }

    fn default_ttl() -> u64 {
        60
    }

    impl ConfigSection for Cache {
        const PATH: &'static str = "cache";
    }

    #[test]
    fn test_lookup() {
        let config = config("a:\n  b: x\n  list: [1, 2]\n");
        assert_eq!(config.get_str("a.b"), Some("x"));
        assert_eq!(config.get_str("a.list[1]"), Some("2"));
        assert!(config.contains("a.list"));
        assert!(!config.contains("a.c"));
        assert!(config.get("a..b").is_none());
        assert_eq!(config.get_str("a"), None);
    }

    #[test]
    fn test_get_as_errors() {
        let config = config("port: http\n");
        assert!(matches!(config.get_as::<u16>("port"), Err(ConfigError::InvalidValue { .. })));
        assert!(matches!(config.get_as::<u16>("host"), Err(ConfigError::MissingPath { .. })));
        assert!(matches!(config.get_as::<u16>("a["), Err(ConfigError::InvalidPath { .. })));
    }

    #[test]
    fn test_get_or() {
        let config = config("retries: '3'\n");
        assert_eq!(config.get_or("retries", 1_u8).unwrap(), 3);
        assert_eq!(config.get_or("timeout", 30_u32).unwrap(), 30);
        assert!(config.get_or("retries", true).is_err());
    }

    #[test]
    fn test_section_missing_uses_defaults() {
        let cache: Cache = config("other: 1\n").section().unwrap();
        assert_eq!(cache, Cache { ttl: 60, regions: Vec::new() });
    }

    #[test]
    fn test_section_present() {
        let cache: Cache = config("cache:\n  ttl: 5\n  regions: eu, us\n").section().unwrap();
        assert_eq!(cache.ttl, 5);
        assert_eq!(cache.regions, vec!["eu", "us"]);
    }

    #[test]
    fn test_keys_and_flatten() {
        let config = config("b: 1\na:\n  c: 2\n");
        assert_eq!(config.keys(), vec!["a.c", "b"]);
        assert_eq!(config.flatten().get("a.c").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_fork_is_independent() {
        let original = config("a: 1\n");
        let fork = original.fork();
        assert!(!Arc::ptr_eq(&original.root, &fork.root));
        assert_eq!(original.root(), fork.root());
        assert!(fork.profiles().contains("dev"));
    }

    #[test]
    fn test_to_json() {
        let json = config("a:\n  b: x\n").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, serde_json::json!({"a": {"b": "x"}}));
    }

    #[test]
    fn test_config_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Config>();
    }
}
