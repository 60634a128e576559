//! The programmer seam: JTAG load and SPI flash command lines.

use crate::error::BuildError;
use crate::toolchain::Artifact;
use kiln_board::DeviceDescriptor;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use tracing::info;

/// An external program invocation, plus a script it reads if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramCommand {
    /// Executable name.
    pub program: String,
    /// Arguments in order.
    pub args: Vec<String>,
    /// Script written to disk before the program runs.
    pub script: Option<(PathBuf, String)>,
}

impl ProgramCommand {
    /// Writes the script, if any, and runs the program to completion.
    pub fn run(&self) -> Result<(), BuildError> {
        if let Some((path, contents)) = &self.script {
            std::fs::write(path, contents).map_err(|e| BuildError::io(path, e))?;
        }
        info!(command = %self, "programming device");
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(|source| BuildError::ToolNotFound {
                tool: self.program.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(BuildError::ToolFailed {
                tool: self.program.clone(),
                status: status.to_string(),
            })
        }
    }
}

impl fmt::Display for ProgramCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Writes build artifacts to a device over JTAG.
pub trait Programmer {
    /// Short tool name for status output.
    fn name(&self) -> &str;

    /// The command loading the bitstream into configuration SRAM.
    fn load_command(&self, artifact: &Artifact) -> Result<ProgramCommand, BuildError>;

    /// The command writing the flash image to the configuration flash.
    fn flash_command(&self, artifact: &Artifact) -> Result<ProgramCommand, BuildError>;

    /// Loads the bitstream; lost on power cycle.
    fn load(&self, artifact: &Artifact) -> Result<(), BuildError> {
        self.load_command(artifact)?.run()
    }

    /// Programs the configuration flash.
    fn flash(&self, artifact: &Artifact) -> Result<(), BuildError> {
        self.flash_command(artifact)?.run()
    }
}

/// OpenOCD with an FT232 cable and a JTAG-to-SPI proxy bitstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOcd {
    config: String,
    flash_proxy: Option<String>,
    part: String,
}

impl OpenOcd {
    /// Reads the cable config and flash proxy from the device descriptor.
    pub fn from_device(device: &DeviceDescriptor) -> Result<Self, BuildError> {
        let config = device.programmer.openocd_config.clone().ok_or_else(|| {
            BuildError::MissingProgrammerInfo {
                board: device.part.clone(),
                what: "OpenOCD config",
            }
        })?;
        Ok(Self {
            config,
            flash_proxy: device.programmer.openocd_proxy.clone(),
            part: device.part.clone(),
        })
    }

    fn command(&self, script: &[String]) -> ProgramCommand {
        ProgramCommand {
            program: "openocd".to_string(),
            args: vec![
                "-f".to_string(),
                self.config.clone(),
                "-c".to_string(),
                script.join("; "),
            ],
            script: None,
        }
    }
}

impl Programmer for OpenOcd {
    fn name(&self) -> &str {
        "openocd"
    }

    fn load_command(&self, artifact: &Artifact) -> Result<ProgramCommand, BuildError> {
        Ok(self.command(&[
            "init".to_string(),
            format!("pld load 0 {{{}}}", artifact.bitstream().display()),
            "exit".to_string(),
        ]))
    }

    fn flash_command(&self, artifact: &Artifact) -> Result<ProgramCommand, BuildError> {
        let proxy = self
            .flash_proxy
            .as_ref()
            .ok_or_else(|| BuildError::MissingProgrammerInfo {
                board: self.part.clone(),
                what: "OpenOCD flash proxy",
            })?;
        Ok(self.command(&[
            "init".to_string(),
            format!("jtagspi_init 0 {{{proxy}}}"),
            format!("jtagspi_program {{{}}} 0x0", artifact.flash_image().display()),
            "fpga_program".to_string(),
            "exit".to_string(),
        ]))
    }
}

/// The Vivado hardware manager in batch mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VivadoProgrammer {
    flash_part: Option<String>,
    part: String,
    device: u32,
}

impl VivadoProgrammer {
    /// Reads the configuration flash part from the device descriptor.
    pub fn from_device(device: &DeviceDescriptor) -> Self {
        Self {
            flash_part: device.programmer.flash_part.clone(),
            part: device.part.clone(),
            device: 0,
        }
    }

    /// Selects the JTAG chain position of the FPGA.
    pub fn with_chain_index(mut self, device: u32) -> Self {
        self.device = device;
        self
    }

    fn command(&self, script_path: PathBuf, body: String) -> ProgramCommand {
        ProgramCommand {
            program: "vivado".to_string(),
            args: vec![
                "-mode".to_string(),
                "batch".to_string(),
                "-source".to_string(),
                script_path.display().to_string(),
                "-nojournal".to_string(),
                "-nolog".to_string(),
            ],
            script: Some((script_path, body)),
        }
    }

    fn open_target(&self) -> String {
        "open_hw_manager\nconnect_hw_server\nopen_hw_target\n".to_string()
    }
}

fn script_path(artifact: &Artifact, suffix: &str) -> PathBuf {
    artifact.build_dir.join(format!("{}_{suffix}.tcl", artifact.name))
}

impl Programmer for VivadoProgrammer {
    fn name(&self) -> &str {
        "vivado"
    }

    fn load_command(&self, artifact: &Artifact) -> Result<ProgramCommand, BuildError> {
        let hw = format!("[lindex [get_hw_devices] {}]", self.device);
        let body = format!(
            "{open}set_property PROBES.FILE {{}} {hw}\n\
             set_property PROGRAM.FILE {{{bit}}} {hw}\n\
             program_hw_devices {hw}\n\
             refresh_hw_device {hw}\n\
             quit\n",
            open = self.open_target(),
            bit = artifact.bitstream().display(),
        );
        Ok(self.command(script_path(artifact, "load"), body))
    }

    fn flash_command(&self, artifact: &Artifact) -> Result<ProgramCommand, BuildError> {
        let flash_part =
            self.flash_part
                .as_ref()
                .ok_or_else(|| BuildError::MissingProgrammerInfo {
                    board: self.part.clone(),
                    what: "configuration flash part",
                })?;
        let hw = format!("[lindex [get_hw_devices] {}]", self.device);
        let cfgmem = format!("[get_property PROGRAM.HW_CFGMEM {hw}]");
        let body = format!(
            "{open}create_hw_cfgmem -hw_device {hw} -mem_dev [lindex [get_cfgmem_parts {{{flash_part}}}] 0]\n\
             set_property PROGRAM.BLANK_CHECK 0 {cfgmem}\n\
             set_property PROGRAM.ERASE 1 {cfgmem}\n\
             set_property PROGRAM.CFG_PROGRAM 1 {cfgmem}\n\
             set_property PROGRAM.VERIFY 1 {cfgmem}\n\
             refresh_hw_device {hw}\n\
             set_property PROGRAM.ADDRESS_RANGE {{use_file}} {cfgmem}\n\
             set_property PROGRAM.FILES [list \"{bin}\"] {cfgmem}\n\
             set_property PROGRAM.UNUSED_PIN_TERMINATION {{pull-none}} {cfgmem}\n\
             program_hw_cfgmem -hw_cfgmem {cfgmem}\n\
             quit\n",
            open = self.open_target(),
            bin = artifact.flash_image().display(),
        );
        Ok(self.command(script_path(artifact, "flash"), body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> DeviceDescriptor {
        kiln_board::load_board("bochen_kintex7_base")
            .unwrap()
            .descriptor()
            .clone()
    }

    fn artifact() -> Artifact {
        Artifact::locate("build", "soc")
    }

    #[test]
    fn openocd_load() {
        let openocd = OpenOcd::from_device(&device()).unwrap();
        let cmd = openocd.load_command(&artifact()).unwrap();
        assert_eq!(
            cmd.to_string(),
            "openocd -f openocd_xc7_ft232.cfg -c 'init; pld load 0 {build/soc.bit}; exit'"
        );
        assert!(cmd.script.is_none());
    }

    #[test]
    fn openocd_flash_uses_proxy() {
        let openocd = OpenOcd::from_device(&device()).unwrap();
        let cmd = openocd.flash_command(&artifact()).unwrap();
        assert_eq!(
            cmd.args[3],
            "init; jtagspi_init 0 {bscan_spi_xc7a325t.bit}; \
             jtagspi_program {build/soc.bin} 0x0; fpga_program; exit"
        );
    }

    #[test]
    fn openocd_requires_config() {
        let mut device = device();
        device.programmer.openocd_config = None;
        assert!(matches!(
            OpenOcd::from_device(&device),
            Err(BuildError::MissingProgrammerInfo { .. })
        ));
    }

    #[test]
    fn vivado_load_script() {
        let cmd = VivadoProgrammer::from_device(&device())
            .load_command(&artifact())
            .unwrap();
        let (path, body) = cmd.script.clone().unwrap();
        assert_eq!(path, PathBuf::from("build/soc_load.tcl"));
        assert!(body.contains("set_property PROGRAM.FILE {build/soc.bit} [lindex [get_hw_devices] 0]"));
        assert_eq!(cmd.program, "vivado");
        assert!(cmd.args.contains(&"build/soc_load.tcl".to_string()));
    }

    #[test]
    fn vivado_flash_names_part() {
        let cmd = VivadoProgrammer::from_device(&device())
            .with_chain_index(1)
            .flash_command(&artifact())
            .unwrap();
        let (_, body) = cmd.script.unwrap();
        assert!(body.contains("[get_cfgmem_parts {mx25l25645g-spi-x1_x2_x4}]"));
        assert!(body.contains("set_property PROGRAM.FILES [list \"build/soc.bin\"]"));
        assert!(body.contains("[lindex [get_hw_devices] 1]"));
    }

    #[test]
    fn vivado_flash_without_part() {
        let mut device = device();
        device.programmer.flash_part = None;
        let err = VivadoProgrammer::from_device(&device)
            .flash_command(&artifact())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "board 'xc7k325t-ffg676-2' has no configuration flash part configured"
        );
    }
}
