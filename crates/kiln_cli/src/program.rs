//! `kiln load` and `kiln flash`: program a built target over JTAG.

use std::path::PathBuf;

use kiln_build::{Artifact, OpenOcd, Programmer, VivadoProgrammer};
use kiln_board::DeviceDescriptor;
use kiln_config::ProgrammerKind;

use crate::project;
use crate::{GlobalArgs, ProgramArgs, ProgrammerChoice, SelectArgs};

/// What to write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Volatile SRAM load of the bitstream.
    Load,
    /// Configuration flash programming.
    Flash,
}

/// Runs `kiln load` or `kiln flash`.
pub fn run(
    args: &ProgramArgs,
    action: Action,
    global: &GlobalArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    let select = SelectArgs {
        target: args.target.clone(),
        board: args.board.clone(),
        ..SelectArgs::default()
    };
    let selection = project::select(&select, global)?;
    let build_dir = args
        .output_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| selection.build_dir.clone());
    let artifact = Artifact::locate(build_dir, &selection.name);

    let kind = match args.programmer {
        Some(ProgrammerChoice::Openocd) => ProgrammerKind::OpenOcd,
        Some(ProgrammerChoice::Vivado) => ProgrammerKind::Vivado,
        None => selection.programmer,
    };
    let programmer = create_programmer(kind, selection.board.descriptor())?;

    let image = match action {
        Action::Load => artifact.bitstream(),
        Action::Flash => artifact.flash_image(),
    };
    if !args.dry_run && !image.is_file() {
        eprintln!(
            "error: {} not found; run `kiln build --run` first",
            image.display()
        );
        return Ok(1);
    }

    let command = match action {
        Action::Load => programmer.load_command(&artifact)?,
        Action::Flash => programmer.flash_command(&artifact)?,
    };
    if args.dry_run {
        if let Some((path, body)) = &command.script {
            println!("# {}", path.display());
            print!("{body}");
        }
        println!("{command}");
        return Ok(0);
    }

    if !global.quiet {
        let verb = match action {
            Action::Load => "Loading",
            Action::Flash => "Flashing",
        };
        eprintln!("   {verb} {} with {}", image.display(), programmer.name());
    }
    command.run()?;
    Ok(0)
}

/// Creates the programmer of the given kind for a device.
pub fn create_programmer(
    kind: ProgrammerKind,
    device: &DeviceDescriptor,
) -> Result<Box<dyn Programmer>, kiln_build::BuildError> {
    let programmer: Box<dyn Programmer> = match kind {
        ProgrammerKind::OpenOcd => Box::new(OpenOcd::from_device(device)?),
        ProgrammerKind::Vivado => Box::new(VivadoProgrammer::from_device(device)),
    };
    Ok(programmer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_both_programmers() {
        let board = kiln_board::load_board("bochen_kintex7_base").unwrap();
        let openocd = create_programmer(ProgrammerKind::OpenOcd, board.descriptor()).unwrap();
        assert_eq!(openocd.name(), "openocd");
        let vivado = create_programmer(ProgrammerKind::Vivado, board.descriptor()).unwrap();
        assert_eq!(vivado.name(), "vivado");
    }

    #[test]
    fn missing_bitstream_exits_one() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("kiln.toml"),
            "[project]\nname = \"soc\"\nboard = \"bochen_kintex7_base\"\n",
        )
        .unwrap();
        let args = ProgramArgs {
            target: None,
            board: None,
            output_dir: None,
            programmer: None,
            dry_run: false,
        };
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(tmp.path().to_str().unwrap().to_string()),
        };
        assert_eq!(run(&args, Action::Load, &global).unwrap(), 1);
    }
}
