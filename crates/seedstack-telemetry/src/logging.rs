//! Structured logging for SeedStack.
//!
//! This module installs a global `tracing-subscriber` with an environment
//! filter and either JSON or human-readable output.
//!
//! # Example
//!
//! ```rust,ignore
//! use seedstack_telemetry::logging::{LogConfig, init_logging};
//!
//! let config = LogConfig::development();
//! init_logging(&config)?;
//!
//! tracing::info!(source = "application.yaml", priority = 0, "Registered source");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g., "info", "seedstack_config=debug,warn").
    pub level: String,

    /// Whether to output JSON format.
    pub json_format: bool,

    /// Whether to include ANSI colors.
    pub ansi: bool,

    /// Whether to include span events (enter, exit, close).
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include thread IDs.
    pub thread_ids: bool,

    /// Whether to include target (module path).
    pub include_target: bool,

    /// Service name reported when logging starts.
    pub service_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true, // JSON by default for production
            ansi: false,
            span_events: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
            service_name: "seedstack".to_string(),
        }
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            ansi: true,
            span_events: true,
            file_line_info: true,
            ..Self::default()
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Sets the service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Checks the filter directive without installing anything.
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError::InvalidConfig` if the level is blank or not a
    /// valid filter directive.
    pub fn validate(&self) -> TelemetryResult<()> {
        if self.level.trim().is_empty() {
            return Err(TelemetryError::InvalidConfig("log level must not be blank".to_string()));
        }
        create_env_filter(&self.level)
            .map(|_| ())
            .map_err(|e| TelemetryError::InvalidConfig(e.to_string()))
    }
}

/// Initializes the logging subsystem.
///
/// # Arguments
///
/// * `config` - Logging configuration
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the filter is invalid and
/// `TelemetryError::AlreadyInitialized` if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| TelemetryError::LoggingInit(format!("Invalid log level: {e}")))?;

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(config.ansi)
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_thread_ids(config.thread_ids)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|_| TelemetryError::AlreadyInitialized)?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(config.ansi)
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_thread_ids(config.thread_ids)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|_| TelemetryError::AlreadyInitialized)?;
    }

    tracing::info!(
        service.name = %config.service_name,
        level = %config.level,
        "logging initialized"
    );
    Ok(())
}

/// Creates an env filter from a string.
///
/// # Arguments
///
/// * `filter` - Filter string (e.g., "info", "seedstack_config=debug,warn")
///
/// # Errors
///
/// Returns error if the filter string is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Standard log fields for SeedStack.
///
/// Use these field names for consistency across logs.
pub mod fields {
    /// Configuration source name.
    pub const SOURCE: &str = "source";

    /// Source priority.
    pub const PRIORITY: &str = "priority";

    /// Active profiles.
    pub const PROFILES: &str = "profiles";

    /// Configuration path or file path.
    pub const PATH: &str = "path";

    /// Application instance identifier.
    pub const INSTANCE_ID: &str = "instance_id";

    /// Service name field name.
    pub const SERVICE_NAME: &str = "service.name";
}
