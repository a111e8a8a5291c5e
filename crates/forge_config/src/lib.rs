//! Parsing and validation of `forge.toml` project configuration files.
//!
//! This crate reads the project configuration and produces a strongly-typed
//! [`ProjectConfig`] describing where content lives, where build outputs are
//! written, and where the incremental build cache is persisted.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE};
pub use types::*;
