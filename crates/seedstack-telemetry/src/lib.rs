//! Observability bootstrap for SeedStack.
//!
//! This crate configures structured logging for SeedStack applications:
//!
//! - **Logging**: JSON or pretty output through `tracing-subscriber`
//! - **Filtering**: `EnvFilter` directives (`info`, `seedstack_config=debug`)
//! - **Fields**: shared field names for configuration events
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               SeedStack Application          │
//! │                                              │
//! │   seedstack-config ──► tracing macros        │
//! │                            │                 │
//! │   ┌────────────────────────▼──────────────┐  │
//! │   │          seedstack-telemetry          │  │
//! │   │   EnvFilter ──► fmt layer (json/pretty)│ │
//! │   └────────────────────────┬──────────────┘  │
//! └────────────────────────────┼─────────────────┘
//!                              ▼
//!                       stdout / stderr
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use seedstack_telemetry::{init_logging, LogConfig};
//!
//! let config = LogConfig::production().with_service_name("shop");
//! init_logging(&config)?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
