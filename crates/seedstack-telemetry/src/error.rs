//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur during telemetry operations.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// A global subscriber was installed before this one.
    #[error("Logging is already initialized")]
    AlreadyInitialized,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::LoggingInit("failed".to_string());
        assert_eq!(err.to_string(), "Failed to initialize logging: failed");
        assert_eq!(
            TelemetryError::AlreadyInitialized.to_string(),
            "Logging is already initialized"
        );
    }

    #[test]
    fn test_invalid_config_display() {
        let err = TelemetryError::InvalidConfig("empty level".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: empty level");
    }
}
