//! Error types for the type registry.

use thiserror::Error;

/// Errors raised by registry operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    /// A type id was not found in the registry.
    #[error("unknown type id {type_id}: not present in the metadata registry")]
    UnknownType { type_id: u16 },

    /// A Rust type was used as a message element without prior registration.
    #[error("type `{type_name}` is not registered as a message element")]
    UnregisteredRustType { type_name: &'static str },

    /// The custom id space (u16) is exhausted.
    #[error("type id space exhausted after {registered} registrations")]
    IdSpaceExhausted { registered: usize },
}

/// Result type for registry operations.
pub type TypeResult<T> = std::result::Result<T, TypeError>;
