//! Kiln CLI: compose, build and program SoC targets.
//!
//! Provides `kiln boards` to list the board catalog, `kiln compose` to check a
//! feature selection and print the resulting target, `kiln build` to render the
//! Vivado inputs (and optionally run Vivado), and `kiln load` / `kiln flash` to
//! program a built target.

#![warn(missing_docs)]

mod boards;
mod build;
mod compose;
mod program;
mod project;

use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use kiln_compose::{FlagMap, FlagValue};
use tracing_subscriber::EnvFilter;

/// Kiln: SoC target composition for Kintex-7 boards.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Kiln SoC target composer")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `kiln.toml` file or the directory holding it.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the built-in boards.
    Boards {
        /// Output format.
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },
    /// Compose a target and print its clocks, subsystems and pins.
    Compose(ComposeArgs),
    /// Render build inputs for a target, optionally running Vivado.
    Build(BuildArgs),
    /// Load a built bitstream into the FPGA.
    Load(ProgramArgs),
    /// Write a built flash image to the configuration flash.
    Flash(ProgramArgs),
}

/// Board and feature selection shared by `compose` and `build`.
#[derive(Args, Debug, Default)]
pub struct SelectArgs {
    /// Target name to select from `kiln.toml`.
    #[arg(short, long)]
    pub target: Option<String>,

    /// Built-in board, overriding the configuration.
    #[arg(short, long)]
    pub board: Option<String>,

    /// TOML board profile, overriding the configuration.
    #[arg(long, conflicts_with = "board")]
    pub board_profile: Option<String>,

    /// Feature switches.
    #[command(flatten)]
    pub features: FeatureArgs,
}

/// Feature switches, named like the flags in `kiln.toml`.
#[derive(Args, Debug, Default)]
pub struct FeatureArgs {
    /// System clock frequency (e.g. `100e6`, `125MHz`).
    #[arg(long)]
    pub sys_clk_freq: Option<String>,
    /// Enable the DDR3 SDRAM.
    #[arg(long)]
    pub with_sdram: bool,
    /// Enable the memory-mapped SPI flash.
    #[arg(long)]
    pub with_spi_flash: bool,
    /// Enable the SD card in SPI mode.
    #[arg(long, conflicts_with = "with_sdcard")]
    pub with_spi_sdcard: bool,
    /// Enable the SD card in native mode.
    #[arg(long)]
    pub with_sdcard: bool,
    /// Enable the Ethernet MAC.
    #[arg(long)]
    pub with_ethernet: bool,
    /// Enable the Etherbone bridge.
    #[arg(long)]
    pub with_etherbone: bool,
    /// Obtain the Ethernet address dynamically.
    #[arg(long)]
    pub eth_dynamic_ip: bool,
    /// Ethernet PHY index.
    #[arg(long)]
    pub eth_phy: Option<u32>,
    /// Enable the HDMI text terminal.
    #[arg(long, conflicts_with = "with_video_framebuffer")]
    pub with_video_terminal: bool,
    /// Enable the HDMI framebuffer.
    #[arg(long)]
    pub with_video_framebuffer: bool,
    /// Video timings (e.g. `800x600@60Hz`).
    #[arg(long)]
    pub video_timings: Option<String>,
    /// Enable the LED chaser.
    #[arg(long)]
    pub with_led_chaser: bool,
    /// Enable the serial console.
    #[arg(long)]
    pub with_uart: bool,
    /// Integrated main RAM size in bytes.
    #[arg(long)]
    pub integrated_main_ram_size: Option<u64>,
    /// SoC identification string.
    #[arg(long)]
    pub ident: Option<String>,
}

impl FeatureArgs {
    /// Returns the switches given on the command line as flags.
    pub fn to_flags(&self) -> FlagMap {
        let mut flags = FlagMap::new();
        let switches = [
            ("with_sdram", self.with_sdram),
            ("with_spi_flash", self.with_spi_flash),
            ("with_spi_sdcard", self.with_spi_sdcard),
            ("with_sdcard", self.with_sdcard),
            ("with_ethernet", self.with_ethernet),
            ("with_etherbone", self.with_etherbone),
            ("eth_dynamic_ip", self.eth_dynamic_ip),
            ("with_video_terminal", self.with_video_terminal),
            ("with_video_framebuffer", self.with_video_framebuffer),
            ("with_led_chaser", self.with_led_chaser),
            ("with_uart", self.with_uart),
        ];
        for (name, on) in switches {
            if on {
                flags.insert(name.to_string(), FlagValue::Bool(true));
            }
        }
        if let Some(freq) = &self.sys_clk_freq {
            flags.insert("sys_clk_freq".to_string(), FlagValue::Str(freq.clone()));
        }
        if let Some(phy) = self.eth_phy {
            flags.insert("eth_phy".to_string(), FlagValue::Int(i64::from(phy)));
        }
        if let Some(timings) = &self.video_timings {
            flags.insert("video_timings".to_string(), FlagValue::Str(timings.clone()));
        }
        if let Some(size) = self.integrated_main_ram_size {
            // Sizes beyond i64 are rejected by the feature parser as negative.
            flags.insert(
                "integrated_main_ram_size".to_string(),
                FlagValue::Int(size as i64),
            );
        }
        if let Some(ident) = &self.ident {
            flags.insert("ident".to_string(), FlagValue::Str(ident.clone()));
        }
        flags
    }
}

/// Arguments for the `kiln compose` subcommand.
#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// Board and features.
    #[command(flatten)]
    pub select: SelectArgs,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `kiln build` subcommand.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Board and features.
    #[command(flatten)]
    pub select: SelectArgs,

    /// Output directory (default: `<build_dir>/<target>`).
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Run Vivado after rendering its inputs.
    #[arg(long)]
    pub run: bool,
}

/// Arguments for `kiln load` and `kiln flash`.
#[derive(Args, Debug)]
pub struct ProgramArgs {
    /// Target name to select from `kiln.toml`.
    #[arg(short, long)]
    pub target: Option<String>,

    /// Built-in board, when there is no `kiln.toml`.
    #[arg(short, long)]
    pub board: Option<String>,

    /// Directory holding the build outputs.
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Programmer, overriding the configuration.
    #[arg(short, long, value_enum)]
    pub programmer: Option<ProgrammerChoice>,

    /// Print the command instead of running it.
    #[arg(long)]
    pub dry_run: bool,
}

/// Programmer selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProgrammerChoice {
    /// OpenOCD with the board's cable configuration.
    Openocd,
    /// The Vivado hardware manager.
    Vivado,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::Boards { format } => boards::run(format),
        Command::Compose(ref args) => compose::run(args, &global),
        Command::Build(ref args) => build::run(args, &global),
        Command::Load(ref args) => program::run(args, program::Action::Load, &global),
        Command::Flash(ref args) => program::run(args, program::Action::Flash, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the stderr log subscriber; `KILN_LOG` overrides the flag-derived level.
fn init_logging(global: &GlobalArgs) {
    let level = if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_env("KILN_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
