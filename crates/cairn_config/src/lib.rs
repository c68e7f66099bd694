//! Parsing and validation of `cairn.toml` build configuration files.
//!
//! This crate reads the build configuration and produces a strongly-typed
//! [`CairnConfig`], then merges caller overrides into a [`ResolvedBuild`]
//! that the linker and compressor consume.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use resolve::{resolve_build, BuildOverrides, ResolvedBuild};
pub use types::*;
