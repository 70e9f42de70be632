//! Errors for message construction and persistence.

use thiserror::Error;
use types::SerialError;

/// Errors raised while building, copying, or loading messages.
#[derive(Debug, Error)]
pub enum MessageError {
    /// The storage block could not be allocated. No partial storage is left
    /// reachable.
    #[error("allocation of {bytes} bytes for {elements}-element storage failed")]
    Alloc { bytes: usize, elements: usize },

    /// A Rust type was used as a message element without registration.
    #[error("type `{type_name}` is not registered as a message element")]
    UnregisteredType { type_name: &'static str },

    /// A type id in a shape description is unknown to the registry.
    #[error("unknown type id {type_id} (context: {context})")]
    UnknownType { type_id: u16, context: &'static str },

    /// An element position was out of bounds.
    #[error("position {pos} out of bounds for message of {len} elements")]
    OutOfBounds { pos: usize, len: usize },

    /// A structural save/load failure.
    #[error(transparent)]
    Serial(#[from] SerialError),
}

/// Result type for message operations.
pub type MessageResult<T> = std::result::Result<T, MessageError>;
