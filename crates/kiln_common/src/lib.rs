//! Shared foundational types used across the Kiln SoC composition toolchain.
//!
//! This crate provides clock frequency values with unit parsing and content
//! hashing used to fingerprint composed target assemblies.

#![warn(missing_docs)]

pub mod frequency;
pub mod hash;

pub use frequency::{Frequency, ParseFrequencyError};
pub use hash::ContentHash;
