//! Configuration sections read by the framework itself.
//!
//! Both sections bind from the resolved tree through [`ConfigSection`], so
//! they honor profiles, removal markers and source priorities like any user
//! section.

use serde::{Deserialize, Serialize};

use crate::config::ConfigSection;
use crate::ConfigError;

/// Application identity (`application.*`).
///
/// # Example
///
/// ```
/// use seedstack_config::{ActiveProfiles, ApplicationSection, Config, Format, parse_str};
///
/// let root = parse_str(
///     "application:\n  name: shop\n  basePackages: [org.shop, org.common]\n",
///     Format::Yaml,
/// )
/// .unwrap();
/// let config = Config::new(root, ActiveProfiles::none());
/// let application: ApplicationSection = config.section().unwrap();
/// assert_eq!(application.name, "shop");
/// assert_eq!(application.id(), "shop");
/// assert_eq!(application.base_packages.len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationSection {
    /// Human-readable application name.
    #[serde(default = "default_application_name")]
    pub name: String,

    /// Unique application identifier. Defaults to the name.
    #[serde(default)]
    pub id: Option<String>,

    /// Application version.
    #[serde(default = "default_application_version")]
    pub version: String,

    /// Packages scanned by the application.
    #[serde(default, alias = "basePackages")]
    pub base_packages: Vec<String>,
}

impl Default for ApplicationSection {
    fn default() -> Self {
        Self {
            name: default_application_name(),
            id: None,
            version: default_application_version(),
            base_packages: Vec::new(),
        }
    }
}

impl ConfigSection for ApplicationSection {
    const PATH: &'static str = "application";
}

impl ApplicationSection {
    /// The application identifier, falling back to the name.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }

    /// Validate the section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the name is blank or the
    /// identifier contains whitespace.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::validation_error("application.name must not be blank"));
        }
        if self.id().chars().any(char::is_whitespace) {
            return Err(ConfigError::validation_error(format!(
                "application.id must not contain whitespace: '{}'",
                self.id()
            )));
        }
        Ok(())
    }
}

fn default_application_name() -> String {
    "seedstack-app".to_string()
}

fn default_application_version() -> String {
    "0.0.0".to_string()
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration (`logging.*`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level or filter directive (`info`, `info,seedstack_config=debug`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include ANSI color codes in output.
    #[serde(default)]
    pub ansi: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi: false,
            include_location: false,
        }
    }
}

impl ConfigSection for LoggingSection {
    const PATH: &'static str = "logging";
}

impl LoggingSection {
    /// Validate the section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if logging is enabled with a
    /// blank level.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.level.trim().is_empty() {
            return Err(ConfigError::validation_error("logging.level must not be blank"));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
