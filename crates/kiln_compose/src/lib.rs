//! Feature-driven composition of SoC targets.
//!
//! The [`Composer`] turns a [`FeatureSet`] into a [`TargetAssembly`] for one
//! board: it builds the clock-domain graph, binds every resource the enabled
//! subsystems need, and records one [`SubsystemBinding`] per subsystem.
//! Composition is all-or-nothing; on error no partial assembly exists.
//!
//! # Usage
//!
//! ```
//! use kiln_board::load_board;
//! use kiln_compose::{Composer, FeatureSet, MemoryFeature};
//!
//! let board = load_board("bochen_kintex7_base").unwrap();
//! let features = FeatureSet {
//!     memory: MemoryFeature::Sdram,
//!     ..FeatureSet::default()
//! };
//! let assembly = Composer::new(board.as_ref()).compose(&features).unwrap();
//! assert!(assembly.clock_graph().domain("sys4x").is_some());
//! ```
//!
//! # Architecture
//!
//! - [`features`]: typed feature set and the string-keyed flag map it is parsed from
//! - [`capability`]: built-in subsystem providers and the [`Capability`] trait
//! - [`composer`]: the composition algorithm
//! - [`assembly`]: the read-only result

#![warn(missing_docs)]

pub mod assembly;
pub mod capability;
pub mod composer;
pub mod error;
pub mod features;

pub use assembly::{SubsystemBinding, TargetAssembly};
pub use capability::{
    Capability, ClockTree, DomainRequest, ResourceRequest, SubsystemHandle, SubsystemKind,
};
pub use composer::Composer;
pub use error::ComposeError;
pub use features::{
    FeatureSet, FlagMap, FlagValue, MemoryFeature, NetworkFeature, SdCardMode, StorageFeature,
    VideoMode, VideoTimings, KNOWN_FLAGS,
};
