//! Configuration file loading and validation.

use std::path::Path;

use crate::error::ConfigError;
use crate::types::{ProjectConfig, LOG_LEVELS};

/// File name of the project configuration inside a project directory.
pub const CONFIG_FILE: &str = "forge.toml";

/// Loads and validates `<project_dir>/forge.toml`.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE))
}

/// Loads and validates a configuration from an explicit file path.
pub fn load_config_file(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::Malformed(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::EmptySetting("project.name"));
    }
    if config.cache.file.as_os_str().is_empty() {
        return Err(ConfigError::EmptySetting("cache.file"));
    }
    if config.cache.output_extension.is_empty() || config.cache.output_extension.contains('.') {
        return Err(ConfigError::BadSetting {
            setting: "cache.output_extension",
            problem: format!(
                "'{}' must be a bare extension such as \"ego\"",
                config.cache.output_extension
            ),
        });
    }
    if config.cache.max_recovery_attempts == 0 {
        return Err(ConfigError::BadSetting {
            setting: "cache.max_recovery_attempts",
            problem: "must be at least 1".to_string(),
        });
    }
    if !LOG_LEVELS.contains(&config.log.level.as_str()) {
        return Err(ConfigError::BadSetting {
            setting: "log.level",
            problem: format!("'{}' is not one of {}", config.log.level, LOG_LEVELS.join(", ")),
        });
    }
    Ok(())
}
