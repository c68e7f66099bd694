//! Configuration types deserialized from `cairn.toml`.

use cairn_map::{Engine, MapType};
use serde::Deserialize;
use std::path::PathBuf;

/// The default zstd level used when compression is enabled.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 19;

/// The top-level configuration parsed from `cairn.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CairnConfig {
    /// What to build and for which engine.
    pub build: BuildConfig,
    /// Resource maps that resource references resolve against.
    #[serde(default)]
    pub resources: ResourceConfig,
    /// Diagnostic policy.
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

/// The `[build]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// The target engine.
    pub engine: Engine,
    /// The scenario name written to the header.
    pub map_name: String,
    /// The build string written to the header.
    #[serde(default)]
    pub build_string: String,
    /// The kind of scenario.
    #[serde(default)]
    pub map_type: MapType,
    /// The zstd level used when `compress` is set.
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
    /// Whether the linked cache is compressed before it is written.
    #[serde(default)]
    pub compress: bool,
    /// Overrides the engine's maximum cache size.
    #[serde(default)]
    pub max_file_size: Option<u64>,
}

fn default_compression_level() -> i32 {
    DEFAULT_COMPRESSION_LEVEL
}

/// The `[resources]` table. Paths are relative to the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    /// Path to `bitmaps.map`.
    #[serde(default)]
    pub bitmaps: Option<PathBuf>,
    /// Path to `sounds.map`.
    #[serde(default)]
    pub sounds: Option<PathBuf>,
    /// Path to `loc.map`.
    #[serde(default)]
    pub loc: Option<PathBuf>,
}

/// The `[diagnostics]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagnosticsConfig {
    /// Treat every warning as an error.
    #[serde(default)]
    pub deny_warnings: bool,
}
