//! Shared helpers: locating `kiln.toml` and turning CLI selections into a
//! board plus feature set.

use std::path::{Path, PathBuf};

use kiln_board::Board;
use kiln_compose::{FeatureSet, FlagMap};
use kiln_config::{BoardSource, ProgrammerKind, CONFIG_FILE};
use tracing::debug;

use crate::{GlobalArgs, SelectArgs};

/// A board and feature set ready to compose, plus where outputs go.
#[derive(Debug)]
pub struct Selection {
    /// Base name of build outputs.
    pub name: String,
    /// Selected `kiln.toml` target, if any.
    pub target: Option<String>,
    /// The board to compose on.
    pub board: Box<dyn Board>,
    /// Merged configuration and command-line features.
    pub features: FeatureSet,
    /// Output directory.
    pub build_dir: PathBuf,
    /// Programmer named by the configuration.
    pub programmer: ProgrammerKind,
}

/// Finds the directory holding `kiln.toml`.
///
/// `--config` may name the file or its directory. Without it, the current
/// directory and its ancestors are searched; `None` means no project.
pub fn find_project_dir(global: &GlobalArgs) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            return Ok(Some(
                p.parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(".")),
            ));
        }
        return Ok(Some(p));
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE).is_file())
        .map(Path::to_path_buf))
}

/// Resolves the board and features from `kiln.toml` (if present) and CLI overrides.
///
/// Command-line switches are overlaid on the resolved target's flags, and a
/// command-line board replaces the configured one.
pub fn select(args: &SelectArgs, global: &GlobalArgs) -> Result<Selection, Box<dyn std::error::Error>> {
    let cli_flags = args.features.to_flags();
    let cli_board = match (&args.board, &args.board_profile) {
        (Some(name), _) => Some(BoardSource::Builtin(name.clone())),
        (None, Some(path)) => Some(BoardSource::Profile(PathBuf::from(path))),
        (None, None) => None,
    };

    let Some(project_dir) = find_project_dir(global)? else {
        if args.target.is_some() {
            return Err(format!("no {CONFIG_FILE} found; --target needs a project").into());
        }
        let source = cli_board.ok_or_else(|| {
            format!("no {CONFIG_FILE} found; use --board, --board-profile or --config")
        })?;
        let board = load(&source, Path::new("."))?;
        return Ok(Selection {
            name: board.name().to_string(),
            target: None,
            features: FeatureSet::from_flags(&cli_flags)?,
            board,
            build_dir: PathBuf::from("build"),
            programmer: ProgrammerKind::default(),
        });
    };

    let config = kiln_config::load_config(&project_dir)?;
    let resolved = match args.target.as_deref() {
        Some(name) => kiln_config::resolve_target(&config, name)?,
        None => kiln_config::resolve_default(&config)?,
    };

    let mut flags: FlagMap = resolved.flags;
    flags.extend(cli_flags);
    let features = FeatureSet::from_flags(&flags)?;

    let source = cli_board.unwrap_or(resolved.board);
    let board = load(&source, &project_dir)?;
    let mut build_dir = project_dir.join(&resolved.build_dir);
    if let Some(target) = &args.target {
        build_dir.push(target);
    }
    debug!(
        project = %project_dir.display(),
        board = board.name(),
        build_dir = %build_dir.display(),
        "selected target"
    );
    Ok(Selection {
        name: config.project.name,
        target: args.target.clone(),
        board,
        features,
        build_dir,
        programmer: resolved.programmer,
    })
}

/// Loads a board; profile paths are relative to `base`.
fn load(source: &BoardSource, base: &Path) -> Result<Box<dyn Board>, kiln_board::BoardError> {
    match source {
        BoardSource::Builtin(name) => kiln_board::load_board(name),
        BoardSource::Profile(path) => {
            let board = kiln_board::load_board_profile(&base.join(path))?;
            Ok(Box::new(board))
        }
    }
}
