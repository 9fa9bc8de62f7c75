//! Configuration sources.
//!
//! A source produces a raw (unprocessed) configuration tree. Documents in
//! TOML, JSON and YAML are converted to [`ConfigNode`] trees where every
//! scalar becomes text and `null` becomes an empty value. Environment
//! variables named `PREFIX__SECTION__KEY` become the path `section.key`.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, warn};

use crate::node::{ConfigNode, MapNode};
use crate::path::ConfigPath;
use crate::{ConfigError, ConfigResult};

/// Standard source priorities (higher wins).
pub mod priority {
    /// Built-in defaults.
    pub const DEFAULTS: i32 = -1000;
    /// Configuration files and inline documents.
    pub const FILE: i32 = 0;
    /// Environment variables.
    pub const ENVIRONMENT: i32 = 1000;
    /// Explicit overrides.
    pub const OVERRIDE: i32 = 2000;
    /// Values injected at runtime, such as generated identifiers.
    pub const RUNTIME: i32 = i32::MAX;
}

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// TOML document.
    Toml,
    /// JSON document.
    Json,
    /// YAML document.
    Yaml,
}

impl Format {
    /// Determines the format from a file extension (case-insensitive).
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))
    }
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| ConfigError::UnsupportedFormat(s.to_string()))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Toml => f.write_str("toml"),
            Format::Json => f.write_str("json"),
            Format::Yaml => f.write_str("yaml"),
        }
    }
}

/// Parses a document into a configuration tree.
///
/// # Example
///
/// ```
/// use seedstack_config::{parse_str, ConfigPath, Format};
///
/// let node = parse_str("application:\n  name: shop\n", Format::Yaml).unwrap();
/// let name = node.get(&ConfigPath::parse("application.name").unwrap());
/// assert_eq!(name.and_then(|n| n.as_value()), Some("shop"));
/// ```
pub fn parse_str(content: &str, format: Format) -> ConfigResult<ConfigNode> {
    let node = match format {
        Format::Toml => from_toml(toml::from_str::<toml::Value>(content)?),
        Format::Json => from_json(serde_json::from_str::<serde_json::Value>(content)?),
        Format::Yaml => from_yaml(serde_yaml::from_str::<serde_yaml::Value>(content)?),
    };
    // An empty document is an empty tree, not an empty value.
    match node {
        ConfigNode::Value(text) if text.is_empty() => Ok(ConfigNode::map()),
        node => Ok(node),
    }
}

/// Reads and parses a configuration file; the format follows the extension.
pub fn load_file(path: impl AsRef<Path>) -> ConfigResult<ConfigNode> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::file_not_found(path));
    }

    let format = Format::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
    debug!(path = %path.display(), %format, "loaded configuration file");
    parse_str(&content, format)
}

fn from_toml(value: toml::Value) -> ConfigNode {
    match value {
        toml::Value::Table(table) => table
            .into_iter()
            .map(|(key, value)| (key, from_toml(value)))
            .collect(),
        toml::Value::Array(items) => ConfigNode::Array(items.into_iter().map(from_toml).collect()),
        toml::Value::String(text) => ConfigNode::Value(text),
        toml::Value::Integer(number) => ConfigNode::Value(number.to_string()),
        toml::Value::Float(number) => ConfigNode::Value(number.to_string()),
        toml::Value::Boolean(flag) => ConfigNode::Value(flag.to_string()),
        toml::Value::Datetime(datetime) => ConfigNode::Value(datetime.to_string()),
    }
}

fn from_json(value: serde_json::Value) -> ConfigNode {
    match value {
        serde_json::Value::Object(object) => object
            .into_iter()
            .map(|(key, value)| (key, from_json(value)))
            .collect(),
        serde_json::Value::Array(items) => {
            ConfigNode::Array(items.into_iter().map(from_json).collect())
        }
        serde_json::Value::String(text) => ConfigNode::Value(text),
        serde_json::Value::Number(number) => ConfigNode::Value(number.to_string()),
        serde_json::Value::Bool(flag) => ConfigNode::Value(flag.to_string()),
        serde_json::Value::Null => ConfigNode::Value(String::new()),
    }
}

fn from_yaml(value: serde_yaml::Value) -> ConfigNode {
    match value {
        serde_yaml::Value::Mapping(mapping) => mapping
            .into_iter()
            .map(|(key, value)| (yaml_key(key), from_yaml(value)))
            .collect(),
        serde_yaml::Value::Sequence(items) => {
            ConfigNode::Array(items.into_iter().map(from_yaml).collect())
        }
        serde_yaml::Value::String(text) => ConfigNode::Value(text),
        serde_yaml::Value::Number(number) => ConfigNode::Value(number.to_string()),
        serde_yaml::Value::Bool(flag) => ConfigNode::Value(flag.to_string()),
        serde_yaml::Value::Null => ConfigNode::Value(String::new()),
        serde_yaml::Value::Tagged(tagged) => from_yaml(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(text) => text,
        serde_yaml::Value::Number(number) => number.to_string(),
        serde_yaml::Value::Bool(flag) => flag.to_string(),
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::Tagged(tagged) => yaml_key(tagged.value),
        other => serde_yaml::to_string(&other)
            .map(|text| text.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Builds a tree from environment variables starting with `PREFIX__`.
///
/// The remainder of the name is split on `__` into lower-cased path
/// segments: `SEEDSTACK__APPLICATION__BASE_PACKAGES=org.shop` becomes
/// `application.base_packages = org.shop`. Variables are applied in name
/// order, so `P__A` followed by `P__A__B` leaves `a` as a map. Variables with
/// an empty segment are skipped.
///
/// # Example
///
/// ```
/// use seedstack_config::{env_node, ConfigPath};
///
/// let vars = vec![("APP__SERVER__PORT".to_string(), "8080".to_string())];
/// let node = env_node("APP", vars);
/// let port = node.get(&ConfigPath::parse("server.port").unwrap());
/// assert_eq!(port.and_then(|n| n.as_value()), Some("8080"));
/// ```
pub fn env_node<I>(prefix: &str, vars: I) -> ConfigNode
where
    I: IntoIterator<Item = (String, String)>,
{
    let marker = format!("{}__", prefix.to_uppercase());
    let selected: BTreeMap<String, String> = vars
        .into_iter()
        .filter(|(key, _)| key.starts_with(&marker))
        .collect();

    let mut root = ConfigNode::Map(MapNode::new());
    for (key, value) in selected {
        match env_path(&key, &marker) {
            Ok(path) => {
                if let Err(error) = root.set(&path, ConfigNode::Value(value)) {
                    warn!(var = %key, %error, "ignoring environment variable");
                }
            }
            Err(error) => warn!(var = %key, %error, "ignoring environment variable"),
        }
    }
    root
}

fn env_path(key: &str, marker: &str) -> ConfigResult<ConfigPath> {
    let remainder = key
        .strip_prefix(marker)
        .ok_or_else(|| ConfigError::env_parse_error(key, "missing prefix"))?;

    let mut path = ConfigPath::root();
    for segment in remainder.split("__") {
        if segment.is_empty() {
            return Err(ConfigError::env_parse_error(key, "empty path segment"));
        }
        path = path.child(segment.to_lowercase());
    }
    Ok(path)
}

/// A named provider of a raw configuration tree.
pub trait ConfigSource: fmt::Debug + Send + Sync {
    /// Unique name of the source.
    fn name(&self) -> &str;

    /// Merge priority (higher wins).
    fn priority(&self) -> i32;

    /// Loads the raw tree.
    fn load(&self) -> ConfigResult<ConfigNode>;

    /// Loads the raw tree and checks that its root is a map.
    ///
    /// A scalar or sequence root would replace every lower-priority source
    /// when merged, so it is rejected.
    ///
    /// # Errors
    ///
    /// Returns the loading error, or `ConfigError::InvalidConfig` naming the
    /// source when the root is not a map.
    fn load_tree(&self) -> ConfigResult<ConfigNode> {
        let node = self.load()?;
        if node.as_map().is_none() {
            return Err(ConfigError::invalid_config(format!(
                "source '{}' must have a map at its root, found {}",
                self.name(),
                node.kind()
            )));
        }
        Ok(node)
    }

    /// File backing this source, if any.
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// A configuration file (TOML, JSON or YAML).
#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    path: PathBuf,
    priority: i32,
    optional: bool,
}

impl FileSource {
    /// Creates a required file source named `file:<path>`.
    pub fn new(path: impl Into<PathBuf>, priority: i32) -> Self {
        let path = path.into();
        Self {
            name: format!("file:{}", path.display()),
            path,
            priority,
            optional: false,
        }
    }

    /// Makes a missing file load as an empty tree instead of failing.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Overrides the source name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl ConfigSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn load(&self) -> ConfigResult<ConfigNode> {
        if self.optional && !self.path.exists() {
            debug!(path = %self.path.display(), "optional configuration file absent");
            return Ok(ConfigNode::map());
        }
        load_file(&self.path)
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Environment variables sharing a prefix.
#[derive(Debug, Clone)]
pub struct EnvSource {
    name: String,
    prefix: String,
    priority: i32,
}

impl EnvSource {
    /// Creates an environment source named `env:<PREFIX>`.
    pub fn new(prefix: &str, priority: i32) -> Self {
        let prefix = prefix.to_uppercase();
        Self {
            name: format!("env:{prefix}"),
            prefix,
            priority,
        }
    }
}

impl ConfigSource for EnvSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn load(&self) -> ConfigResult<ConfigNode> {
        Ok(env_node(&self.prefix, env::vars()))
    }
}

/// An inline document in one of the supported formats.
#[derive(Debug, Clone)]
pub struct StringSource {
    name: String,
    content: String,
    format: Format,
    priority: i32,
}

impl StringSource {
    /// Creates an inline source.
    pub fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        format: Format,
        priority: i32,
    ) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            format,
            priority,
        }
    }
}

impl ConfigSource for StringSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn load(&self) -> ConfigResult<ConfigNode> {
        parse_str(&self.content, self.format)
    }
}

/// An in-memory tree.
#[derive(Debug, Clone)]
pub struct NodeSource {
    name: String,
    node: ConfigNode,
    priority: i32,
}

impl NodeSource {
    /// Creates an in-memory source.
    pub fn new(name: impl Into<String>, node: ConfigNode, priority: i32) -> Self {
        Self {
            name: name.into(),
            node,
            priority,
        }
    }
}

impl ConfigSource for NodeSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn load(&self) -> ConfigResult<ConfigNode> {
        Ok(self.node.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn value<'a>(node: &'a ConfigNode, path: &str) -> Option<&'a str> {
        node.get(&ConfigPath::parse(path).unwrap())
            .and_then(ConfigNode::as_value)
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_extension("TOML"), Some(Format::Toml));
        assert_eq!(Format::from_extension("yml"), Some(Format::Yaml));
        assert_eq!(Format::from_extension("ini"), None);
        assert!("properties".parse::<Format>().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let node = parse_str(
            r#"
            [application]
            name = "shop"
            port = 8080
            ratio = 0.5
            packages = ["org.a", "org.b"]
            "#,
            Format::Toml,
        )
        .unwrap();
        assert_eq!(value(&node, "application.name"), Some("shop"));
        assert_eq!(value(&node, "application.port"), Some("8080"));
        assert_eq!(value(&node, "application.ratio"), Some("0.5"));
        assert_eq!(value(&node, "application.packages[1]"), Some("org.b"));
    }

    #[test]
    fn test_parse_json_null_and_bool() {
        let node =
            parse_str(r#"{"a": null, "b": true, "c": [1, {"d": 2}]}"#, Format::Json).unwrap();
        assert_eq!(value(&node, "a"), Some(""));
        assert_eq!(value(&node, "b"), Some("true"));
        assert_eq!(value(&node, "c[1].d"), Some("2"));
    }

    #[test]
    fn test_parse_yaml_preserves_order_and_decorations() {
        let node = parse_str("z: 1\n-a: 2\nb<dev>: 3\n", Format::Yaml).unwrap();
        let keys: Vec<_> = node.as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "-a", "b<dev>"]);
    }

    #[test]
    fn test_parse_yaml_non_string_keys() {
        let node = parse_str("1: one\ntrue: yes\n", Format::Yaml).unwrap();
        assert_eq!(value(&node, "1"), Some("one"));
        assert_eq!(value(&node, "true"), Some("yes"));
    }

    #[test]
    fn test_parse_empty_document() {
        assert!(parse_str("", Format::Yaml).unwrap().is_empty_map());
        assert!(parse_str("", Format::Toml).unwrap().is_empty_map());
    }

    #[test]
    fn test_load_tree_requires_map_root() {
        let source = StringSource::new("inline", "[1, 2]", Format::Yaml, 0);
        assert!(source.load().is_ok());
        let error = source.load_tree().unwrap_err();
        assert!(matches!(error, ConfigError::InvalidConfig { .. }));
        assert!(error.to_string().contains("'inline'"));

        let source = StringSource::new("empty", "", Format::Yaml, 0);
        assert!(source.load_tree().unwrap().is_empty_map());
    }

    #[test]
    fn test_parse_invalid_documents() {
        assert!(matches!(parse_str("{", Format::Json), Err(ConfigError::JsonError(_))));
        assert!(matches!(parse_str("a = ", Format::Toml), Err(ConfigError::TomlError(_))));
        assert!(matches!(parse_str("a: [", Format::Yaml), Err(ConfigError::YamlError(_))));
    }

    #[test]
    fn test_load_file_not_found() {
        assert!(matches!(
            load_file("/nonexistent/application.yaml"),
            Err(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_load_file_unsupported_extension() {
        let file = NamedTempFile::with_suffix(".ini").unwrap();
        assert!(matches!(load_file(file.path()), Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_file_source_loads_yaml() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(file, "application:\n  name: shop").unwrap();

        let source = FileSource::new(file.path(), priority::FILE);
        assert!(source.name().starts_with("file:"));
        assert_eq!(source.path(), Some(file.path()));
        let node = source.load().unwrap();
        assert_eq!(value(&node, "application.name"), Some("shop"));
    }

    #[test]
    fn test_optional_file_source_missing() {
        let source = FileSource::new("/nonexistent/application.yaml", priority::FILE).optional();
        assert!(source.load().unwrap().is_empty_map());

        let required = FileSource::new("/nonexistent/application.yaml", priority::FILE);
        assert!(required.load().is_err());
    }

    #[test]
    fn test_env_node_maps_segments() {
        let vars = vec![
            ("SEED__APPLICATION__NAME".to_string(), "shop".to_string()),
            ("SEED__APPLICATION__BASE_PACKAGES".to_string(), "org.a,org.b".to_string()),
            ("OTHER__APPLICATION__NAME".to_string(), "ignored".to_string()),
            ("SEEDLING".to_string(), "ignored".to_string()),
        ];
        let node = env_node("seed", vars);
        assert_eq!(value(&node, "application.name"), Some("shop"));
        assert_eq!(value(&node, "application.base_packages"), Some("org.a,org.b"));
        assert_eq!(node.flatten().len(), 2);
    }

    #[test]
    fn test_env_node_skips_empty_segments() {
        let vars = vec![
            ("SEED____NAME".to_string(), "x".to_string()),
            ("SEED__".to_string(), "y".to_string()),
        ];
        assert!(env_node("SEED", vars).is_empty_map());
    }

    #[test]
    fn test_env_node_nested_overrides_scalar() {
        let vars = vec![
            ("SEED__A__B".to_string(), "2".to_string()),
            ("SEED__A".to_string(), "1".to_string()),
        ];
        let node = env_node("SEED", vars);
        assert_eq!(value(&node, "a.b"), Some("2"));
    }

    #[test]
    fn test_string_source_parses_on_load() {
        let source = StringSource::new("inline", "a = 1\n", Format::Toml, priority::OVERRIDE);
        assert_eq!(source.priority(), priority::OVERRIDE);
        assert_eq!(value(&source.load().unwrap(), "a"), Some("1"));

        let broken = StringSource::new("broken", "a = ", Format::Toml, priority::OVERRIDE);
        assert!(broken.load().is_err());
    }

    #[test]
    fn test_node_source() {
        let node = ConfigNode::from_iter([("a", ConfigNode::from("1"))]);
        let source = NodeSource::new("defaults", node, priority::DEFAULTS);
        assert_eq!(source.name(), "defaults");
        assert_eq!(source.priority(), priority::DEFAULTS);
        assert!(source.path().is_none());
        assert_eq!(value(&source.load().unwrap(), "a"), Some("1"));
    }

    #[test]
    fn test_env_source_name() {
        let source = EnvSource::new("seed", priority::ENVIRONMENT);
        assert_eq!(source.name(), "env:SEED");
        assert_eq!(source.priority(), priority::ENVIRONMENT);
    }
}
