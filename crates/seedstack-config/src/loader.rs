//! Layered configuration builder.
//!
//! This module provides the [`ConfigBuilder`] for assembling the sources of a
//! [`ConfigResolver`]: in-code defaults, files, inline documents, environment
//! variables and runtime values, each at its standard priority.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::node::ConfigNode;
use crate::path::ConfigPath;
use crate::profile::ActiveProfiles;
use crate::resolver::ConfigResolver;
use crate::source::{
    priority, ConfigSource, EnvSource, FileSource, Format, NodeSource, StringSource,
};
use crate::{Config, ConfigError};

/// Name of the source holding in-code defaults.
pub const DEFAULTS_SOURCE: &str = "defaults";

/// Name of the source holding runtime values.
pub const RUNTIME_SOURCE: &str = "runtime";

/// Configuration builder with layered approach.
///
/// Sources are merged by priority, higher priority winning:
/// 1. Defaults ([`priority::DEFAULTS`])
/// 2. Configuration files and inline documents ([`priority::FILE`])
/// 3. Environment variables ([`priority::ENVIRONMENT`])
/// 4. Runtime values ([`priority::RUNTIME`])
///
/// Sources sharing a priority are merged in the order they were added.
///
/// # Example
///
/// ```no_run
/// use seedstack_config::ConfigBuilder;
///
/// # fn main() -> Result<(), seedstack_config::ConfigError> {
/// let config = ConfigBuilder::new()
///     .with_file("application.yaml")?
///     .with_optional_file("application.override.yaml")?
///     .with_env_prefix("SEEDSTACK")
///     .with_profiles_from_env()
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    sources: Vec<Arc<dyn ConfigSource>>,
    runtime: Option<ConfigNode>,
    profiles: ActiveProfiles,
    inline_count: usize,
}

impl ConfigBuilder {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use seedstack_config::ConfigBuilder;
    ///
    /// let config = ConfigBuilder::new().load().unwrap();
    /// assert!(config.root().is_empty_map());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add in-code defaults.
    ///
    /// Calling this again replaces the previous defaults.
    ///
    /// # Example
    ///
    /// ```
    /// use seedstack_config::{ConfigBuilder, ConfigNode};
    ///
    /// let defaults = ConfigNode::from_iter([("greeting", ConfigNode::from("hello"))]);
    /// let config = ConfigBuilder::new().with_defaults(defaults).load().unwrap();
    /// assert_eq!(config.get_str("greeting"), Some("hello"));
    /// ```
    #[must_use]
    pub fn with_defaults(self, defaults: ConfigNode) -> Self {
        self.with_source(NodeSource::new(DEFAULTS_SOURCE, defaults, priority::DEFAULTS))
    }

    /// Add a configuration file at [`priority::FILE`].
    ///
    /// Supports TOML, JSON and YAML, chosen by extension.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file does not exist or has an unsupported
    /// extension. Parse errors are reported by [`Self::build`].
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        self.with_file_priority(path, priority::FILE)
    }

    /// Add a configuration file at a custom priority.
    ///
    /// # Errors
    ///
    /// Same as [`Self::with_file`].
    pub fn with_file_priority<P: AsRef<Path>>(
        self,
        path: P,
        priority: i32,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        Format::from_path(path)?;
        Ok(self.with_source(FileSource::new(path, priority)))
    }

    /// Add a configuration file if it exists.
    ///
    /// A missing file is still registered (as an empty tree) so that it can
    /// be watched and picked up once created.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the extension is not supported.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        Format::from_path(path)?;
        Ok(self.with_source(FileSource::new(path, priority::FILE).optional()))
    }

    /// Add an inline document at [`priority::FILE`].
    ///
    /// # Arguments
    ///
    /// * `content` - Configuration content as a string
    /// * `format` - Document format ("toml", "json", "yaml" or "yml")
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the format is unknown, the content does not
    /// parse, or the document root is not a map.
    ///
    /// # Example
    ///
    /// ```
    /// use seedstack_config::ConfigBuilder;
    ///
    /// let toml = r#"
    ///     [application]
    ///     name = "shop"
    /// "#;
    ///
    /// let config = ConfigBuilder::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.get_str("application.name"), Some("shop"));
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let format: Format = format.parse()?;
        let name = format!("string:{}", self.inline_count);
        let source = StringSource::new(name, content, format, priority::FILE);
        source.load_tree()?;
        self.inline_count += 1;
        Ok(self.with_source(source))
    }

    /// Read environment variables of the form `PREFIX__SECTION__KEY`.
    ///
    /// For example, with prefix "SEEDSTACK":
    /// - `SEEDSTACK__APPLICATION__NAME=shop` sets `application.name`
    /// - `SEEDSTACK__LOGGING__LEVEL=debug` sets `logging.level`
    #[must_use]
    pub fn with_env_prefix(self, prefix: &str) -> Self {
        self.with_source(EnvSource::new(prefix, priority::ENVIRONMENT))
    }

    /// Load a `.env` file into the process environment.
    ///
    /// A missing `.env` file is ignored.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(ConfigError::env_parse_error(".env", e.to_string())),
        }
        Ok(self)
    }

    /// Set the active profiles.
    #[must_use]
    pub fn with_profiles(mut self, profiles: ActiveProfiles) -> Self {
        self.profiles = profiles;
        self
    }

    /// Read the active profiles from `seedstack.profiles` or
    /// `SEEDSTACK_PROFILES`.
    #[must_use]
    pub fn with_profiles_from_env(self) -> Self {
        self.with_profiles(ActiveProfiles::from_env())
    }

    /// Set a value at [`priority::RUNTIME`], above every other source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPath` if the path is malformed.
    ///
    /// # Example
    ///
    /// ```
    /// use seedstack_config::ConfigBuilder;
    ///
    /// let config = ConfigBuilder::new()
    ///     .with_string("server:\n  port: 80\n", "yaml")
    ///     .unwrap()
    ///     .with_runtime_value("server.port", "8080")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.get_str("server.port"), Some("8080"));
    /// ```
    pub fn with_runtime_value(
        mut self,
        path: &str,
        value: impl Into<ConfigNode>,
    ) -> Result<Self, ConfigError> {
        let path = ConfigPath::parse(path)?;
        self.runtime
            .get_or_insert_with(ConfigNode::map)
            .set(&path, value.into())?;
        Ok(self)
    }

    /// Add a custom source.
    #[must_use]
    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Load every source and build the resolver.
    ///
    /// # Errors
    ///
    /// Returns the first loading or parsing error.
    pub fn build(self) -> Result<ConfigResolver, ConfigError> {
        let mut resolver = ConfigResolver::new(self.profiles);
        for source in self.sources {
            resolver.register_source(source)?;
        }
        if let Some(runtime) = self.runtime {
            resolver.register(RUNTIME_SOURCE, runtime, priority::RUNTIME);
        }
        info!(
            sources = resolver.len(),
            profiles = %resolver.profiles(),
            "configuration sources loaded"
        );
        Ok(resolver)
    }

    /// Build the resolver and return the resolved configuration.
    ///
    /// # Errors
    ///
    /// Same as [`Self::build`].
    pub fn load(self) -> Result<Config, ConfigError> {
        Ok(self.build()?.resolve())
    }
}
