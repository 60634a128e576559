//! Error types for resource registration and allocation.

/// Errors raised while building a resource catalog or binding its entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    /// A descriptor with the same `(name, index)` is already registered.
    #[error("duplicate resource '{name}' index {index}")]
    DuplicateResource {
        /// The resource name.
        name: String,
        /// The repeated index.
        index: u32,
    },

    /// No descriptor matches the request.
    #[error("unknown resource '{name}'{}", .index.map(|i| format!(" index {i}")).unwrap_or_default())]
    UnknownResource {
        /// The requested name.
        name: String,
        /// The requested index; `None` for whole-family requests.
        index: Option<u32>,
    },

    /// The resource was already bound into a subsystem in this allocation.
    #[error("resource '{name}' index {index} is already bound")]
    ResourceAlreadyBound {
        /// The resource name.
        name: String,
        /// The resource index.
        index: u32,
    },

    /// A descriptor declares a pin group without any pins.
    #[error("resource '{name}' index {index} has an empty pin group")]
    EmptyPins {
        /// The resource name.
        name: String,
        /// The resource index.
        index: u32,
    },
}
