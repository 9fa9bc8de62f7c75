//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading, resolving or binding configuration.
///
/// The resolution pipeline itself (removal, profiles, priority merge) never
/// fails; these errors only come from the edges: reading sources, parsing
/// documents, navigating paths and binding typed values.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Failed to read configuration file.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON parsing error.
    #[error("failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("failed to parse YAML configuration: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The document format could not be determined or is not supported.
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// A configuration path expression could not be parsed or applied.
    #[error("invalid configuration path '{path}': {reason}")]
    InvalidPath {
        /// The offending path expression.
        path: String,
        /// Explanation of the problem.
        reason: String,
    },

    /// A required configuration path has no value.
    #[error("missing configuration value at '{path}'")]
    MissingPath {
        /// The path that was looked up.
        path: String,
    },

    /// A value exists but cannot be bound to the requested type.
    #[error("invalid configuration value at '{path}': {reason}")]
    InvalidValue {
        /// The path of the value.
        path: String,
        /// Explanation of why the value is invalid.
        reason: String,
    },

    /// Environment variable parsing error.
    #[error("failed to parse environment variable {var}: {reason}")]
    EnvParseError {
        /// The environment variable name.
        var: String,
        /// Explanation of the parsing error.
        reason: String,
    },

    /// No source is registered under the given name.
    #[error("unknown configuration source: {name}")]
    UnknownSource {
        /// The requested source name.
        name: String,
    },

    /// Validation error after binding.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),

    /// Invalid configuration for a component.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Create a new file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a new read error.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Create a new invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new missing path error.
    pub fn missing_path(path: impl Into<String>) -> Self {
        Self::MissingPath { path: path.into() }
    }

    /// Create a new invalid value error.
    pub fn invalid_value(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new environment variable parse error.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Create a new unknown source error.
    pub fn unknown_source(name: impl Into<String>) -> Self {
        Self::UnknownSource { name: name.into() }
    }

    /// Create a new invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a new validation error.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}
