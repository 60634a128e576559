//! Clock-domain derivation graph for Kiln SoC targets.
//!
//! A [`ClockGraph`] starts from one or more root domains (physical
//! oscillators) and grows by deriving new domains from frequency
//! synthesizers (PLL/MMCM instances). The graph is append-only and every
//! derived domain must name an upstream that already exists, so it is
//! acyclic by construction.
//!
//! # Usage
//!
//! ```
//! use kiln_clock::{ClockGraph, SynthesizerLimits};
//! use kiln_common::Frequency;
//!
//! let mut graph = ClockGraph::new();
//! graph.add_root("clk50", Frequency::from_mhz(50.0)).unwrap();
//! let pll = graph.new_synthesizer("crg_pll");
//! graph.derive(pll, "clk50", "sys", Frequency::from_mhz(100.0)).unwrap();
//! let finalized = graph.finalize(&SynthesizerLimits::s7_mmcm(-2)).unwrap();
//! assert_eq!(finalized.domains().len(), 2);
//! ```
//!
//! # Architecture
//!
//! - [`domain`]: domain records, purpose tags, derive parameters
//! - [`graph`]: the builder and the finalized, read-only graph
//! - [`synthesizer`]: synthesizer instances, device limits, divider solver
//! - [`ids`]: opaque synthesizer identifiers

#![warn(missing_docs)]

pub mod domain;
pub mod error;
pub mod graph;
pub mod ids;
pub mod synthesizer;

pub use domain::{ClockDomain, DeriveSpec, DomainSource, FalsePath, Purpose};
pub use error::ClockError;
pub use graph::{ClockGraph, FinalizedClockGraph};
pub use ids::SynthesizerId;
pub use synthesizer::{
    MmcmLimits, OutputConfig, SolvedSynthesizer, Synthesizer, SynthesizerConfig,
    SynthesizerLimits,
};
