//! Configuration resolution for SeedStack.
//!
//! This crate turns a set of raw configuration sources into one merged,
//! read-only tree:
//! - TOML, JSON and YAML documents, environment variables and in-code values
//! - Removal markers (`-key`) that delete a sibling key
//! - Profile-scoped keys (`key<dev, test>`) kept only for active profiles
//! - Priority merging, higher priority sources overriding lower ones
//!
//! # Overview
//!
//! Every source goes through the same pipeline before merging:
//!
//! ```text
//!  source ──► RemovalProcessor ──► ProfileProcessor ──► PriorityMergeProvider ──► Config
//! ```
//!
//! - [`ConfigNode`] - the tree (maps, arrays and text leaves)
//! - [`RemovalProcessor`] / [`ProfileProcessor`] - per-source transformations
//! - [`PriorityMergeProvider`] - the merged view of all sources
//! - [`ConfigResolver`] - owns the raw sources and replays the pipeline
//! - [`ConfigBuilder`] - layered construction of a resolver
//! - [`Config`] - the resolved configuration with typed binding
//!
//! # Example
//!
//! ```no_run
//! use seedstack_config::{ApplicationSection, ConfigBuilder};
//!
//! # fn main() -> Result<(), seedstack_config::ConfigError> {
//! let config = ConfigBuilder::new()
//!     .with_file("application.yaml")?
//!     .with_env_prefix("SEEDSTACK")
//!     .with_profiles_from_env()
//!     .load()?;
//!
//! let application: ApplicationSection = config.section()?;
//! println!("Starting {}", application.name);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```yaml
//! application:
//!   name: shop
//!   basePackages: [org.shop]
//!
//! datasource<dev, test>:
//!   url: jdbc:h2:mem:shop
//! datasource<prod>:
//!   url: jdbc:postgresql://db/shop
//!
//! -legacy: ~          # removes `legacy` from this document
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden via environment variables using the format
//! `PREFIX__SECTION__KEY`. For example:
//!
//! - `SEEDSTACK__APPLICATION__NAME=shop`
//! - `SEEDSTACK__LOGGING__LEVEL=debug`

#![warn(missing_docs)]

mod config;
mod de;
mod error;
mod loader;
mod node;
mod path;
mod processor;
mod profile;
mod provider;
mod removal;
mod resolver;
mod schema;
mod source;
mod watcher;

pub use config::{Config, ConfigSection};
pub use de::{from_node, DeError};
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigBuilder, DEFAULTS_SOURCE, RUNTIME_SOURCE};
pub use node::{ConfigNode, MapNode, NodeKind};
pub use path::{ConfigPath, PathSegment};
pub use processor::{descend, TreeProcessor};
pub use profile::{
    parse_decoration, strip_decoration, ActiveProfiles, ProfileDecoration, ProfileProcessor,
    PROFILES_ENV, PROFILES_PROPERTY,
};
pub use provider::PriorityMergeProvider;
pub use removal::{removal_target, RemovalProcessor, REMOVAL_MARKER};
pub use resolver::ConfigResolver;
pub use schema::{ApplicationSection, LogFormat, LoggingSection};
pub use source::{
    env_node, load_file, parse_str, priority, ConfigSource, EnvSource, FileSource, Format,
    NodeSource, StringSource,
};
pub use watcher::{ChangeKind, SourceChange, SourceWatcher, SourceWatcherBuilder};
