//! The application context.
//!
//! An [`Application`] owns the configuration sources of one running
//! instance and the configuration currently resolved from them. Readers take
//! cheap [`Config`] snapshots; profile changes and source reloads resolve a
//! new snapshot and swap it in.
//!
//! ```text
//!  ApplicationBuilder ──build──► Application
//!                                  ├─ Mutex<ConfigResolver>   raw sources, profiles
//!                                  ├─ RwLock<Config>          current snapshot
//!                                  └─ InstanceId              runtime.instance-id
//! ```

use std::path::Path;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use seedstack_config::{
    priority, ActiveProfiles, ApplicationSection, Config, ConfigBuilder, ConfigNode,
    ConfigResolver, ConfigSource, LogFormat, LoggingSection, SourceChange, SourceWatcher,
};
use seedstack_telemetry::{init_logging, LogConfig, TelemetryError};
use tracing::{debug, info, warn};

use crate::error::ApplicationResult;
use crate::instance::InstanceId;

/// Name of the source holding the generated instance identifier.
pub const INSTANCE_SOURCE: &str = "runtime:instance";

/// Path of the generated instance identifier.
pub const INSTANCE_ID_PATH: &str = "runtime.instance-id";

/// Builder for an [`Application`].
///
/// Wraps a [`ConfigBuilder`] and adds application-level options.
///
/// # Example
///
/// ```no_run
/// use seedstack::Application;
///
/// # fn main() -> Result<(), seedstack::ApplicationError> {
/// let app = Application::builder()
///     .with_file("application.yaml")?
///     .with_env_prefix("SEEDSTACK")
///     .with_profiles_from_env()
///     .with_logging(true)
///     .build()?;
///
/// println!("{} started", app.application()?.name);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ApplicationBuilder {
    config: ConfigBuilder,
    logging: bool,
}

impl ApplicationBuilder {
    /// Create a new application builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add in-code defaults.
    #[must_use]
    pub fn with_defaults(mut self, defaults: ConfigNode) -> Self {
        self.config = self.config.with_defaults(defaults);
        self
    }

    /// Add a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or has an unsupported
    /// extension.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> ApplicationResult<Self> {
        self.config = self.config.with_file(path)?;
        Ok(self)
    }

    /// Add a configuration file if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is not supported.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> ApplicationResult<Self> {
        self.config = self.config.with_optional_file(path)?;
        Ok(self)
    }

    /// Add an inline document ("toml", "json", "yaml").
    ///
    /// # Errors
    ///
    /// Returns an error if the format is unknown or the content does not parse.
    pub fn with_string(mut self, content: &str, format: &str) -> ApplicationResult<Self> {
        self.config = self.config.with_string(content, format)?;
        Ok(self)
    }

    /// Read `PREFIX__SECTION__KEY` environment variables.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.config = self.config.with_env_prefix(prefix);
        self
    }

    /// Load a `.env` file into the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn with_dotenv(mut self) -> ApplicationResult<Self> {
        self.config = self.config.with_dotenv()?;
        Ok(self)
    }

    /// Set the active profiles.
    #[must_use]
    pub fn with_profiles(mut self, profiles: ActiveProfiles) -> Self {
        self.config = self.config.with_profiles(profiles);
        self
    }

    /// Read the active profiles from the environment.
    #[must_use]
    pub fn with_profiles_from_env(mut self) -> Self {
        self.config = self.config.with_profiles_from_env();
        self
    }

    /// Set a value above every other source.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is malformed.
    pub fn with_runtime_value(
        mut self,
        path: &str,
        value: impl Into<ConfigNode>,
    ) -> ApplicationResult<Self> {
        self.config = self.config.with_runtime_value(path, value)?;
        Ok(self)
    }

    /// Add a custom source.
    #[must_use]
    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.config = self.config.with_source(source);
        self
    }

    /// Initialize logging from the `logging` section when building.
    ///
    /// Default is false.
    #[must_use]
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    /// Load every source, resolve the configuration and start the instance.
    ///
    /// # Errors
    ///
    /// Returns an error if a source fails to load, if the `application` or
    /// `logging` sections are invalid, or if logging cannot be initialized.
    pub fn build(self) -> ApplicationResult<Application> {
        let resolver = self.config.build()?;
        let app = Application::start(resolver);

        let application = app.application()?;
        application.validate()?;

        if self.logging {
            let logging: LoggingSection = app.config().section()?;
            logging.validate()?;
            start_logging(&log_config(&logging, application.id()))?;
        }

        info!(
            application = %application.name,
            instance_id = %app.instance_id,
            profiles = %app.config().profiles(),
            "application configured"
        );
        Ok(app)
    }
}

/// A running application instance and its configuration.
///
/// # Example
///
/// ```
/// use seedstack::Application;
/// use seedstack::config::ActiveProfiles;
///
/// let app = Application::builder()
///     .with_string("mode<dev>: debug\nmode<prod>: fast\n", "yaml")
///     .unwrap()
///     .with_profiles(ActiveProfiles::parse("dev"))
///     .build()
///     .unwrap();
/// assert_eq!(app.config().get_str("mode"), Some("debug"));
///
/// app.set_profiles(ActiveProfiles::parse("prod"));
/// assert_eq!(app.config().get_str("mode"), Some("fast"));
/// ```
#[derive(Debug)]
pub struct Application {
    resolver: Mutex<ConfigResolver>,
    config: RwLock<Config>,
    instance_id: InstanceId,
}

impl Application {
    /// Create a new application builder.
    #[must_use]
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Wraps a resolver, registering a freshly generated instance id.
    pub fn start(mut resolver: ConfigResolver) -> Self {
        let instance_id = InstanceId::new();
        resolver.register(INSTANCE_SOURCE, instance_node(instance_id), priority::RUNTIME);
        let config = resolver.resolve();
        debug!(
            instance_id = %instance_id,
            sources = resolver.len(),
            "application instance started"
        );
        Self {
            resolver: Mutex::new(resolver),
            config: RwLock::new(config),
            instance_id,
        }
    }

    /// The current configuration snapshot.
    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    /// This instance's identifier.
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// Binds the `application` section.
    ///
    /// # Errors
    ///
    /// Returns an error if the section does not fit [`ApplicationSection`].
    pub fn application(&self) -> ApplicationResult<ApplicationSection> {
        Ok(self.config().section()?)
    }

    /// Source names in merge order (lowest precedence first).
    pub fn source_names(&self) -> Vec<String> {
        self.resolver
            .lock()
            .source_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Builds an isolated instance from deep copies of every source.
    ///
    /// The fork gets its own instance id; later changes to either instance
    /// are invisible to the other.
    pub fn fork(&self) -> Self {
        let resolver = self.resolver.lock().fork();
        let fork = Self::start(resolver);
        info!(parent = %self.instance_id, instance_id = %fork.instance_id, "forked application");
        fork
    }

    /// Re-resolves the configuration for new active profiles.
    pub fn set_profiles(&self, profiles: ActiveProfiles) -> Config {
        let mut resolver = self.resolver.lock();
        resolver.set_profiles(profiles);
        self.publish(&resolver)
    }

    /// Reloads the source registered under `name` and re-resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is unknown or cannot be loaded; the
    /// current configuration is kept in that case.
    pub fn reload_source(&self, name: &str) -> ApplicationResult<Config> {
        let mut resolver = self.resolver.lock();
        if let Err(error) = resolver.reload(name) {
            warn!(source = %name, %error, "keeping previous configuration");
            return Err(error.into());
        }
        Ok(self.publish(&resolver))
    }

    /// Applies a change reported by a [`SourceWatcher`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::reload_source`].
    pub fn apply_change(&self, change: &SourceChange) -> ApplicationResult<Config> {
        debug!(
            source = %change.source,
            path = %change.path.display(),
            kind = ?change.kind,
            "applying source change"
        );
        self.reload_source(&change.source)
    }

    /// Creates a watcher over every file-backed source.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no file-backed source or if a watch
    /// cannot be set up.
    pub fn watch_sources(&self, debounce: Duration) -> ApplicationResult<SourceWatcher> {
        let paths = self.resolver.lock().watched_paths();
        let watcher = SourceWatcher::builder()
            .with_debounce(debounce)
            .watch_sources(paths)?
            .build()?;
        Ok(watcher)
    }

    /// Applies every change reported by `watcher` until it stops.
    ///
    /// Failed reloads are logged and the previous configuration is kept.
    pub async fn follow(&self, watcher: &mut SourceWatcher) {
        while let Some(change) = watcher.next().await {
            if let Err(error) = self.apply_change(&change) {
                warn!(source = %change.source, %error, "configuration reload failed");
            }
        }
    }

    fn publish(&self, resolver: &ConfigResolver) -> Config {
        let config = resolver.resolve();
        *self.config.write() = config.clone();
        info!(
            instance_id = %self.instance_id,
            profiles = %config.profiles(),
            "configuration refreshed"
        );
        config
    }
}

fn instance_node(id: InstanceId) -> ConfigNode {
    ConfigNode::from_iter([(
        "runtime",
        ConfigNode::from_iter([("instance-id", ConfigNode::from(id.to_string()))]),
    )])
}

fn log_config(section: &LoggingSection, service_name: &str) -> LogConfig {
    LogConfig {
        enabled: section.enabled,
        level: section.level.clone(),
        json_format: section.format == LogFormat::Json,
        ansi: section.ansi,
        file_line_info: section.include_location,
        ..LogConfig::default()
    }
    .with_service_name(service_name)
}

fn start_logging(config: &LogConfig) -> ApplicationResult<()> {
    config.validate()?;
    match init_logging(config) {
        Err(TelemetryError::AlreadyInitialized) => {
            debug!("global subscriber already installed, keeping it");
            Ok(())
        }
        other => other.map_err(Into::into),
    }
}
