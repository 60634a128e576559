//! `kiln build`: compose a target and render its Vivado inputs.

use std::path::PathBuf;

use kiln_build::{Toolchain, VivadoToolchain};

use crate::project;
use crate::{BuildArgs, GlobalArgs};

/// Runs the `kiln build` command.
///
/// Composition errors abort before anything is written. Vivado itself only
/// runs with `--run`.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let selection = project::select(&args.select, global)?;
    let assembly = crate::compose::compose(&selection, global)?;

    let build_dir = args
        .output_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| selection.build_dir.clone());
    let toolchain = VivadoToolchain::new(&build_dir, &selection.name).with_run(args.run);

    if !global.quiet {
        for note in assembly.notes() {
            eprintln!("       Note {note}");
        }
        eprintln!(
            "   Building {} with {} into {}",
            selection.name,
            toolchain.name(),
            build_dir.display()
        );
    }

    let artifact = toolchain.build(&assembly)?;

    if !global.quiet {
        eprintln!();
        for path in [artifact.constraints(), artifact.script(), artifact.manifest()] {
            eprintln!("   Generated {}", path.display());
        }
        if args.run {
            eprintln!("   Bitstream {}", artifact.bitstream().display());
        } else {
            eprintln!("   Build inputs ready; rerun with --run to invoke Vivado.");
        }
    }
    Ok(0)
}
