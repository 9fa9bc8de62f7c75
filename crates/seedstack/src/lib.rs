//! # SeedStack
//!
//! **Layered configuration for SeedStack applications**
//!
//! SeedStack resolves the configuration of an application from several
//! prioritized sources:
//!
//! - **Layered sources** – defaults, TOML/JSON/YAML files, environment variables and runtime values
//! - **Profiles** – keys decorated with `<dev, test>` only exist when a listed profile is active
//! - **Removal markers** – a `-key` entry deletes `key` from its own document
//! - **Live refresh** – profile switches and file changes re-resolve without a restart
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use seedstack::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = Application::builder()
//!         .with_optional_file("application.yaml")?
//!         .with_env_prefix("SEEDSTACK")
//!         .with_profiles_from_env()
//!         .with_logging(true)
//!         .build()?;
//!
//!     let mut watcher = app.watch_sources(std::time::Duration::from_millis(500))?;
//!     app.follow(&mut watcher).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! sources → RemovalProcessor → ProfileProcessor → PriorityMergeProvider → Config
//!                                                                          ↓
//!                                                    Application (snapshot, instance id)
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod application;
mod error;
mod instance;

// Re-export configuration types
pub use seedstack_config as config;

// Re-export logging types
pub use seedstack_telemetry as telemetry;

pub use application::{Application, ApplicationBuilder, INSTANCE_ID_PATH, INSTANCE_SOURCE};
pub use error::{ApplicationError, ApplicationResult};
pub use instance::InstanceId;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use seedstack::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Application, ApplicationBuilder, ApplicationError, ApplicationResult, InstanceId,
    };

    // Re-export configuration types
    pub use seedstack_config::{
        priority, ActiveProfiles, ApplicationSection, Config, ConfigBuilder, ConfigError,
        ConfigNode, ConfigSection, ConfigSource, LoggingSection, SourceChange, SourceWatcher,
    };

    // Re-export logging types
    pub use seedstack_telemetry::{init_logging, LogConfig};
}
