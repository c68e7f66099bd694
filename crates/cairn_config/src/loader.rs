//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::CairnConfig;
use cairn_map::HEADER_SIZE;
use std::ops::RangeInclusive;
use std::path::Path;

/// The configuration file name looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "cairn.toml";

/// zstd levels accepted in configuration.
pub(crate) const COMPRESSION_LEVELS: RangeInclusive<i32> = 1..=22;

/// Loads and validates `cairn.toml` from a project directory.
pub fn load_config(project_dir: &Path) -> Result<CairnConfig, ConfigError> {
    let content = std::fs::read_to_string(project_dir.join(CONFIG_FILE_NAME))?;
    load_config_from_str(&content)
}

/// Parses and validates a `cairn.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<CairnConfig, ConfigError> {
    let config: CairnConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

pub(crate) fn validate_compression_level(level: i32) -> Result<(), ConfigError> {
    if COMPRESSION_LEVELS.contains(&level) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "compression level {level} is outside {}..={}",
            COMPRESSION_LEVELS.start(),
            COMPRESSION_LEVELS.end()
        )))
    }
}

fn validate_config(config: &CairnConfig) -> Result<(), ConfigError> {
    if config.build.map_name.is_empty() {
        return Err(ConfigError::MissingField("build.map_name".to_string()));
    }
    validate_compression_level(config.build.compression_level)?;
    if let Some(max) = config.build.max_file_size {
        if max < HEADER_SIZE as u64 {
            return Err(ConfigError::ValidationError(format!(
                "max_file_size {max} is smaller than the {HEADER_SIZE}-byte header"
            )));
        }
    }
    Ok(())
}
