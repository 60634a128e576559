//! Physical I/O resource catalog and per-build allocation for Kiln.
//!
//! A board's pin table is loaded into an immutable [`ResourceRegistry`]. Each
//! composition opens its own [`Allocation`] against the registry; requesting a
//! resource through the allocation binds it, and a second strict request of
//! the same `(name, index)` fails with
//! [`ResourceError::ResourceAlreadyBound`].

#![warn(missing_docs)]

pub mod descriptor;
pub mod error;
pub mod registry;

pub use descriptor::{AttrKey, Attrs, PinGroup, ResourceDescriptor, ResourceKey};
pub use error::ResourceError;
pub use registry::{Allocation, ResourceRegistry};
