//! The toolchain seam and its Vivado implementation.

use crate::error::BuildError;
use crate::tcl::render_tcl;
use crate::xdc::render_xdc;
use kiln_common::ContentHash;
use kiln_compose::TargetAssembly;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// The outputs of one build, addressed by build name inside a directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Base name shared by every output file.
    pub name: String,
    /// Directory holding the outputs.
    pub build_dir: PathBuf,
    /// Fingerprint of the assembly the outputs were rendered from, when known.
    pub fingerprint: Option<ContentHash>,
}

impl Artifact {
    /// Locates the outputs of an earlier build without rebuilding.
    pub fn locate(build_dir: impl Into<PathBuf>, name: &str) -> Self {
        Self {
            name: name.to_string(),
            build_dir: build_dir.into(),
            fingerprint: None,
        }
    }

    /// Returns `<build_dir>/<name>.<extension>`.
    pub fn file(&self, extension: &str) -> PathBuf {
        self.build_dir.join(format!("{}.{extension}", self.name))
    }

    /// The SRAM bitstream.
    pub fn bitstream(&self) -> PathBuf {
        self.file("bit")
    }

    /// The SPI flash image written by the board's additional commands.
    pub fn flash_image(&self) -> PathBuf {
        self.file("bin")
    }

    /// The constraint file.
    pub fn constraints(&self) -> PathBuf {
        self.file("xdc")
    }

    /// The build script.
    pub fn script(&self) -> PathBuf {
        self.file("tcl")
    }

    /// The assembly manifest.
    pub fn manifest(&self) -> PathBuf {
        self.file("json")
    }
}

/// Turns a composed target into build outputs.
pub trait Toolchain {
    /// Short tool name for status output.
    fn name(&self) -> &str;

    /// Renders (and, if configured, runs) the build for `assembly`.
    fn build(&self, assembly: &TargetAssembly) -> Result<Artifact, BuildError>;
}

/// Renders `.xdc`, `.tcl` and `.json` files for Vivado and optionally runs it.
#[derive(Debug, Clone)]
pub struct VivadoToolchain {
    build_dir: PathBuf,
    build_name: String,
    run: bool,
    executable: String,
}

impl VivadoToolchain {
    /// Creates a render-only toolchain writing into `build_dir`.
    pub fn new(build_dir: impl Into<PathBuf>, build_name: &str) -> Self {
        Self {
            build_dir: build_dir.into(),
            build_name: build_name.to_string(),
            run: false,
            executable: "vivado".to_string(),
        }
    }

    /// Runs Vivado in batch mode after rendering.
    pub fn with_run(mut self, run: bool) -> Self {
        self.run = run;
        self
    }

    /// Overrides the Vivado executable.
    pub fn with_executable(mut self, executable: &str) -> Self {
        self.executable = executable.to_string();
        self
    }

    fn invoke(&self, artifact: &Artifact) -> Result<(), BuildError> {
        let script = format!("{}.tcl", artifact.name);
        info!(tool = %self.executable, script = %script, "running synthesis");
        let status = Command::new(&self.executable)
            .args(["-mode", "batch", "-source", &script])
            .current_dir(&self.build_dir)
            .status()
            .map_err(|source| BuildError::ToolNotFound {
                tool: self.executable.clone(),
                source,
            })?;
        if !status.success() {
            return Err(BuildError::ToolFailed {
                tool: self.executable.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

impl Toolchain for VivadoToolchain {
    fn name(&self) -> &str {
        "vivado"
    }

    fn build(&self, assembly: &TargetAssembly) -> Result<Artifact, BuildError> {
        std::fs::create_dir_all(&self.build_dir)
            .map_err(|e| BuildError::io(&self.build_dir, e))?;

        let artifact = Artifact {
            name: self.build_name.clone(),
            build_dir: self.build_dir.clone(),
            fingerprint: Some(assembly.fingerprint()),
        };
        write_file(&artifact.constraints(), &render_xdc(assembly))?;
        write_file(&artifact.script(), &render_tcl(assembly, &self.build_name))?;
        write_file(&artifact.manifest(), &assembly.to_json()?)?;
        info!(
            name = %artifact.name,
            dir = %self.build_dir.display(),
            fingerprint = %assembly.fingerprint(),
            "rendered build inputs"
        );

        if self.run {
            self.invoke(&artifact)?;
        } else {
            debug!("synthesis not requested");
        }
        Ok(artifact)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), BuildError> {
    std::fs::write(path, contents).map_err(|e| BuildError::io(path, e))?;
    debug!(path = %path.display(), bytes = contents.len(), "wrote build input");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_compose::{Composer, FeatureSet, MemoryFeature};

    fn assembly() -> TargetAssembly {
        let board = kiln_board::load_board("bochen_kintex7_base").unwrap();
        Composer::new(board.as_ref())
            .compose(&FeatureSet {
                memory: MemoryFeature::Sdram,
                ..FeatureSet::default()
            })
            .unwrap()
    }

    #[test]
    fn renders_all_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let build_dir = dir.path().join("out");
        let assembly = assembly();
        let artifact = VivadoToolchain::new(&build_dir, "soc")
            .build(&assembly)
            .unwrap();

        assert_eq!(artifact.fingerprint, Some(assembly.fingerprint()));
        assert_eq!(artifact.bitstream(), build_dir.join("soc.bit"));
        assert_eq!(artifact.flash_image(), build_dir.join("soc.bin"));
        assert!(artifact.constraints().is_file());
        assert!(artifact.script().is_file());
        assert!(!artifact.bitstream().exists());

        let manifest = std::fs::read_to_string(artifact.manifest()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&manifest).unwrap();
        assert_eq!(json["ident"], "Kiln SoC on Bochen Kintex7 Base");
    }

    #[test]
    fn rebuild_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = VivadoToolchain::new(dir.path(), "soc");
        let first = toolchain.build(&assembly()).unwrap();
        let xdc = std::fs::read_to_string(first.constraints()).unwrap();
        let second = toolchain.build(&assembly()).unwrap();
        assert_eq!(first, second);
        assert_eq!(xdc, std::fs::read_to_string(second.constraints()).unwrap());
    }

    #[test]
    fn missing_executable_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = VivadoToolchain::new(dir.path(), "soc")
            .with_run(true)
            .with_executable("kiln-test-no-such-vivado")
            .build(&assembly())
            .unwrap_err();
        assert!(matches!(err, BuildError::ToolNotFound { .. }));
    }

    #[test]
    fn locate_has_no_fingerprint() {
        let artifact = Artifact::locate("build", "soc");
        assert_eq!(artifact.script(), PathBuf::from("build/soc.tcl"));
        assert!(artifact.fingerprint.is_none());
    }
}
