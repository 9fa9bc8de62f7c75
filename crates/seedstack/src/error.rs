//! Application error types.

use seedstack_config::ConfigError;
use seedstack_telemetry::TelemetryError;
use thiserror::Error;

/// Result type for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;

/// Errors raised while building or refreshing an [`Application`](crate::Application).
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Configuration could not be loaded, resolved or bound.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Logging could not be initialized.
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_error() {
        let err: ApplicationError = ConfigError::unknown_source("app").into();
        assert!(matches!(err, ApplicationError::Config(ConfigError::UnknownSource { .. })));
        assert!(err.to_string().starts_with("Configuration error:"));
    }

    #[test]
    fn test_from_telemetry_error() {
        let err: ApplicationError = TelemetryError::AlreadyInitialized.into();
        assert_eq!(err.to_string(), "Telemetry error: Logging is already initialized");
    }
}
