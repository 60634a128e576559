//! Parsing and validation of `kiln.toml` project configuration files.
//!
//! This crate reads the project configuration file and produces a strongly-typed
//! [`ProjectConfig`]. Targets are resolved by merging the global `[features]`
//! table with a target's own overrides into a [`kiln_compose::FeatureSet`].

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use resolve::{resolve_default, resolve_target, ResolvedTarget};
pub use types::*;
