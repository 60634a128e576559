//! Target resolution: merging global and target-specific feature flags.

use crate::error::ConfigError;
use crate::types::{BoardSource, ProgrammerKind, ProjectConfig, TargetConfig};
use kiln_compose::{FeatureSet, FlagMap, FlagValue};
use std::path::PathBuf;
use tracing::debug;

/// A fully resolved target: board, merged flags and the typed feature set.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    /// The target name, or the project name for the default target.
    pub name: String,
    /// Board the target composes on.
    pub board: BoardSource,
    /// Merged flags (global base + target overlay).
    pub flags: FlagMap,
    /// Typed features parsed from `flags`.
    pub features: FeatureSet,
    /// Output directory, relative to the project directory.
    pub build_dir: PathBuf,
    /// Programmer for load and flash.
    pub programmer: ProgrammerKind,
}

/// Resolves the project without any target overrides.
pub fn resolve_default(config: &ProjectConfig) -> Result<ResolvedTarget, ConfigError> {
    resolve(config, &config.project.name, &TargetConfig::default())
}

/// Resolves a named target by merging global settings with target-specific overrides.
///
/// Global `[features]` form the base and the target's flags override matching
/// entries; flag names are compared after `-` to `_` normalization. A target
/// board (built-in or profile) replaces the project board.
pub fn resolve_target(
    config: &ProjectConfig,
    target_name: &str,
) -> Result<ResolvedTarget, ConfigError> {
    let target = config
        .targets
        .get(target_name)
        .ok_or_else(|| ConfigError::UnknownTarget(target_name.to_string()))?;
    resolve(config, target_name, target)
}

fn resolve(
    config: &ProjectConfig,
    name: &str,
    target: &TargetConfig,
) -> Result<ResolvedTarget, ConfigError> {
    let mut flags = FlagMap::new();
    for (flag, value) in config.features.iter().chain(&target.features) {
        flags.insert(flag.replace('-', "_"), value.clone());
    }
    if let Some(ident) = &config.project.ident {
        flags
            .entry("ident".to_string())
            .or_insert_with(|| FlagValue::Str(ident.clone()));
    }

    let board = match (&target.board, &target.board_profile) {
        (Some(board), _) => BoardSource::Builtin(board.clone()),
        (None, Some(profile)) => BoardSource::Profile(PathBuf::from(profile)),
        (None, None) => project_board(config)?,
    };

    let features = FeatureSet::from_flags(&flags)?;
    debug!(target_name = name, flags = flags.len(), ?board, "resolved target");
    Ok(ResolvedTarget {
        name: name.to_string(),
        board,
        flags,
        features,
        build_dir: PathBuf::from(&config.build.build_dir),
        programmer: config.build.programmer,
    })
}

fn project_board(config: &ProjectConfig) -> Result<BoardSource, ConfigError> {
    match (&config.project.board, &config.project.board_profile) {
        (Some(board), _) => Ok(BoardSource::Builtin(board.clone())),
        (None, Some(profile)) => Ok(BoardSource::Profile(PathBuf::from(profile))),
        (None, None) => Err(ConfigError::MissingField("project.board".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;
    use kiln_compose::{ComposeError, MemoryFeature, SdCardMode};

    const CONFIG: &str = r#"
[project]
name = "soc"
board = "bochen_kintex7_base"
ident = "Project SoC"

[features]
with_sdram = true
with-spi-flash = true

[targets.lean]
[targets.lean.features]
with_sdram = false
with_spi_sdcard = true

[targets.named]
[targets.named.features]
ident = "Named SoC"

[targets.custom]
board_profile = "boards/custom.toml"

[targets.clash]
[targets.clash.features]
with_spi_sdcard = true
with_sdcard = true
"#;

    #[test]
    fn default_uses_global_features() {
        let config = load_config_from_str(CONFIG).unwrap();
        let resolved = resolve_default(&config).unwrap();
        assert_eq!(resolved.name, "soc");
        assert_eq!(
            resolved.board,
            BoardSource::Builtin("bochen_kintex7_base".to_string())
        );
        assert_eq!(resolved.features.memory, MemoryFeature::Sdram);
        assert!(resolved.features.storage.spi_flash);
        assert_eq!(resolved.features.ident.as_deref(), Some("Project SoC"));
        assert_eq!(resolved.build_dir, PathBuf::from("build"));
    }

    #[test]
    fn target_flags_override_global() {
        let config = load_config_from_str(CONFIG).unwrap();
        let resolved = resolve_target(&config, "lean").unwrap();
        assert_eq!(resolved.features.memory, MemoryFeature::None);
        assert_eq!(resolved.features.storage.sdcard, SdCardMode::Spi);
        // Dashed global name merged with the normalized one.
        assert!(resolved.features.storage.spi_flash);
        assert!(resolved.flags.contains_key("with_spi_flash"));
    }

    #[test]
    fn ident_flag_beats_project_ident() {
        let config = load_config_from_str(CONFIG).unwrap();
        let resolved = resolve_target(&config, "named").unwrap();
        assert_eq!(resolved.features.ident.as_deref(), Some("Named SoC"));
    }

    #[test]
    fn target_board_profile() {
        let config = load_config_from_str(CONFIG).unwrap();
        let resolved = resolve_target(&config, "custom").unwrap();
        assert_eq!(
            resolved.board,
            BoardSource::Profile(PathBuf::from("boards/custom.toml"))
        );
    }

    #[test]
    fn exclusive_flags_fail_resolution() {
        let config = load_config_from_str(CONFIG).unwrap();
        let err = resolve_target(&config, "clash").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Features(ComposeError::InvalidFeatureCombination(_))
        ));
    }

    #[test]
    fn unknown_target_errors() {
        let config = load_config_from_str(CONFIG).unwrap();
        let err = resolve_target(&config, "nonexistent").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTarget(_)));
    }
}
