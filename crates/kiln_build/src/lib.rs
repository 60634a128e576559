//! Build and programming collaborators for composed Kiln targets.
//!
//! A [`TargetAssembly`](kiln_compose::TargetAssembly) is turned into vendor
//! toolchain inputs by a [`Toolchain`], and the resulting [`Artifact`] is
//! written to the device by a [`Programmer`].
//!
//! # Usage
//!
//! ```no_run
//! use kiln_build::{OpenOcd, Programmer, Toolchain, VivadoToolchain};
//! use kiln_compose::{Composer, FeatureSet};
//!
//! let board = kiln_board::load_board("bochen_kintex7_base").unwrap();
//! let assembly = Composer::new(board.as_ref())
//!     .compose(&FeatureSet::default())
//!     .unwrap();
//! let artifact = VivadoToolchain::new("build", "soc").build(&assembly).unwrap();
//! OpenOcd::from_device(assembly.device_descriptor())
//!     .unwrap()
//!     .load(&artifact)
//!     .unwrap();
//! ```
//!
//! # Architecture
//!
//! - [`xdc`] renders pin, I/O standard, clock and false-path constraints.
//! - [`tcl`] renders the batch build script around the board's bitstream and
//!   post-bitstream commands.
//! - [`toolchain`] writes both plus the JSON manifest and optionally runs Vivado.
//! - [`programmer`] renders OpenOCD and Vivado hardware-manager invocations.

#![warn(missing_docs)]

pub mod error;
pub mod programmer;
pub mod tcl;
pub mod toolchain;
pub mod xdc;

pub use error::BuildError;
pub use programmer::{OpenOcd, ProgramCommand, Programmer, VivadoProgrammer};
pub use tcl::render_tcl;
pub use toolchain::{Artifact, Toolchain, VivadoToolchain};
pub use xdc::{port_name, render_xdc};
