//! Configuration types deserialized from `kiln.toml`.

use kiln_compose::FlagMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The top-level project configuration parsed from `kiln.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Project metadata and the default board.
    pub project: ProjectMeta,
    /// Feature flags shared by every target.
    #[serde(default)]
    pub features: FlagMap,
    /// Named target configurations (e.g. "minimal", "full").
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,
    /// Build settings.
    #[serde(default)]
    pub build: BuildConfig,
}

/// Core project metadata required in every `kiln.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMeta {
    /// The project name, also the base name of every build output.
    pub name: String,
    /// A brief description of the project.
    #[serde(default)]
    pub description: String,
    /// Built-in board name.
    #[serde(default)]
    pub board: Option<String>,
    /// Path to a TOML board profile, relative to the project directory.
    #[serde(default)]
    pub board_profile: Option<String>,
    /// SoC identification string; the `ident` feature flag wins if both are set.
    #[serde(default)]
    pub ident: Option<String>,
}

/// A named target: an optional board override plus feature overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetConfig {
    /// Built-in board name overriding the project board.
    #[serde(default)]
    pub board: Option<String>,
    /// Board profile path overriding the project board.
    #[serde(default)]
    pub board_profile: Option<String>,
    /// Flags overlaid on the global `[features]` table.
    #[serde(default)]
    pub features: FlagMap,
}

/// Build configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    /// Output directory, relative to the project directory.
    #[serde(default = "default_build_dir")]
    pub build_dir: String,
    /// Programmer used by `kiln load` and `kiln flash`.
    #[serde(default)]
    pub programmer: ProgrammerKind,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            build_dir: default_build_dir(),
            programmer: ProgrammerKind::default(),
        }
    }
}

fn default_build_dir() -> String {
    "build".to_string()
}

/// Which programmer drives the JTAG cable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgrammerKind {
    /// OpenOCD with the board's FT232 cable configuration.
    #[default]
    OpenOcd,
    /// The Vivado hardware manager.
    Vivado,
}

/// Where the board description comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardSource {
    /// A board compiled into the catalog.
    Builtin(String),
    /// A TOML board profile on disk.
    Profile(PathBuf),
}
