//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use kiln_compose::{FlagMap, KNOWN_FLAGS};
use std::path::Path;

/// File name looked up in the project directory.
pub const CONFIG_FILE: &str = "kiln.toml";

/// Loads and validates a `kiln.toml` configuration from a project directory.
///
/// Reads `<project_dir>/kiln.toml`, parses it, and validates required fields.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `kiln.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and flag names are known.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    match (&config.project.board, &config.project.board_profile) {
        (None, None) => {
            return Err(ConfigError::MissingField(
                "project.board or project.board_profile".to_string(),
            ))
        }
        (Some(_), Some(_)) => {
            return Err(ConfigError::ValidationError(
                "project.board and project.board_profile are mutually exclusive".to_string(),
            ))
        }
        _ => {}
    }
    if config.build.build_dir.is_empty() {
        return Err(ConfigError::MissingField("build.build_dir".to_string()));
    }
    check_flag_names(&config.features, "features")?;

    for (name, target) in &config.targets {
        if target.board.is_some() && target.board_profile.is_some() {
            return Err(ConfigError::ValidationError(format!(
                "targets.{name}: board and board_profile are mutually exclusive"
            )));
        }
        check_flag_names(&target.features, &format!("targets.{name}.features"))?;
    }
    Ok(())
}

fn check_flag_names(flags: &FlagMap, table: &str) -> Result<(), ConfigError> {
    for name in flags.keys() {
        if !KNOWN_FLAGS.contains(&name.replace('-', "_").as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown feature flag '{name}' in [{table}]"
            )));
        }
    }
    Ok(())
}
