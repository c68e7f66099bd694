//! Build resolution: merging caller overrides into the file configuration.

use crate::error::ConfigError;
use crate::loader::validate_compression_level;
use crate::types::{CairnConfig, ResourceConfig};
use cairn_map::{Engine, MapType};
use std::path::Path;

/// Overrides a caller applies on top of `cairn.toml`.
#[derive(Debug, Clone, Default)]
pub struct BuildOverrides {
    /// Replaces `build.engine`.
    pub engine: Option<Engine>,
    /// Replaces `build.compress`.
    pub compress: Option<bool>,
    /// Replaces `build.compression_level`.
    pub compression_level: Option<i32>,
}

/// A fully resolved build with overrides applied and limits computed.
#[derive(Debug, Clone)]
pub struct ResolvedBuild {
    /// The target engine.
    pub engine: Engine,
    /// The scenario name.
    pub map_name: String,
    /// The build string.
    pub build_string: String,
    /// The kind of scenario.
    pub map_type: MapType,
    /// The zstd level, or `None` when the output is not compressed.
    pub compression: Option<i32>,
    /// The largest linked cache allowed.
    pub max_file_size: u64,
    /// Whether warnings fail the build.
    pub deny_warnings: bool,
    /// Resource map locations, resolved against the project directory.
    pub resources: ResourceConfig,
}

/// Merges `overrides` into `config`.
///
/// `max_file_size` falls back to the engine limit. Resource paths are joined
/// onto `project_dir`.
pub fn resolve_build(
    config: &CairnConfig,
    overrides: &BuildOverrides,
    project_dir: &Path,
) -> Result<ResolvedBuild, ConfigError> {
    let engine = overrides.engine.unwrap_or(config.build.engine);
    let compress = overrides.compress.unwrap_or(config.build.compress);
    let level = overrides
        .compression_level
        .unwrap_or(config.build.compression_level);
    validate_compression_level(level)?;

    let join = |p: &Option<std::path::PathBuf>| p.as_ref().map(|p| project_dir.join(p));
    Ok(ResolvedBuild {
        engine,
        map_name: config.build.map_name.clone(),
        build_string: config.build.build_string.clone(),
        map_type: config.build.map_type,
        compression: compress.then_some(level),
        max_file_size: config
            .build
            .max_file_size
            .unwrap_or_else(|| engine.max_cache_size()),
        deny_warnings: config.diagnostics.deny_warnings,
        resources: ResourceConfig {
            bitmaps: join(&config.resources.bitmaps),
            sounds: join(&config.resources.sounds),
            loc: join(&config.resources.loc),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    const BASE: &str = r#"
[build]
engine = "custom-edition"
map_name = "bloodgulch"
compression_level = 5

[resources]
bitmaps = "maps/bitmaps.map"
"#;

    #[test]
    fn resolve_without_overrides() {
        let config = load_config_from_str(BASE).unwrap();
        let build = resolve_build(&config, &BuildOverrides::default(), Path::new("/proj")).unwrap();
        assert_eq!(build.engine, Engine::CustomEdition);
        assert_eq!(build.compression, None);
        assert_eq!(build.max_file_size, 0x1800_0000);
        assert_eq!(
            build.resources.bitmaps.as_deref(),
            Some(Path::new("/proj/maps/bitmaps.map"))
        );
        assert!(build.resources.sounds.is_none());
    }

    #[test]
    fn overrides_replace_engine_and_compression() {
        let config = load_config_from_str(BASE).unwrap();
        let overrides = BuildOverrides {
            engine: Some(Engine::Retail),
            compress: Some(true),
            compression_level: None,
        };
        let build = resolve_build(&config, &overrides, Path::new(".")).unwrap();
        assert_eq!(build.engine, Engine::Retail);
        assert_eq!(build.compression, Some(5));
        assert_eq!(build.max_file_size, 0x800_0000);
    }

    #[test]
    fn explicit_limit_wins() {
        let toml = format!("{BASE}\n[diagnostics]\ndeny_warnings = true\n")
            .replace("compression_level = 5", "max_file_size = 4096");
        let config = load_config_from_str(&toml).unwrap();
        let build = resolve_build(&config, &BuildOverrides::default(), Path::new(".")).unwrap();
        assert_eq!(build.max_file_size, 4096);
        assert!(build.deny_warnings);
    }

    #[test]
    fn invalid_override_level() {
        let config = load_config_from_str(BASE).unwrap();
        let overrides = BuildOverrides {
            compression_level: Some(0),
            ..BuildOverrides::default()
        };
        let err = resolve_build(&config, &overrides, Path::new(".")).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
