//! Structural serializer and deserializer surface.
//!
//! Message persistence is format-agnostic: the storage layer walks its
//! elements and drives one of these trait objects through structural
//! callbacks (`begin_tuple` .. `end_tuple`) plus primitive writes. Two
//! families of implementations exist in `libs/message`: a compact binary
//! form that carries a typed prefix, and a human-readable form that does
//! not. The `human_readable` capability flag tells element implementations
//! which family they are talking to; the storage layer itself never branches
//! on it.

use crate::type_id::TypeId;
use crate::type_id_list::TypeIdList;
use thiserror::Error;

/// Errors raised while saving or loading a message.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SerialError {
    /// Input ended before the expected data.
    #[error("unexpected end of input: need {need} more bytes at offset {offset} (context: {context})")]
    UnexpectedEof {
        need: usize,
        offset: usize,
        context: &'static str,
    },

    /// Structurally invalid input.
    #[error("malformed input at offset {offset}: {description}")]
    Malformed { offset: usize, description: String },

    /// The stream names a type id the registry does not know.
    #[error("unknown type id {type_id} in serialized type sequence")]
    UnknownType { type_id: u16 },

    /// The stream's type sequence disagrees with the caller-supplied shape.
    #[error("type sequence mismatch: expected {expected}, stream carries {got}")]
    TypeSequenceMismatch { expected: String, got: String },

    /// The operation is not supported by this serializer family.
    #[error("unsupported operation: {what}")]
    Unsupported { what: &'static str },
}

impl SerialError {
    /// Truncated-input error with position context.
    pub fn unexpected_eof(need: usize, offset: usize, context: &'static str) -> Self {
        SerialError::UnexpectedEof {
            need,
            offset,
            context,
        }
    }

    /// Malformed-input error with position context.
    pub fn malformed(offset: usize, description: impl Into<String>) -> Self {
        SerialError::Malformed {
            offset,
            description: description.into(),
        }
    }
}

/// Result type for save/load operations.
pub type SerialResult<T> = std::result::Result<T, SerialError>;

/// Structural sink for saving a message.
///
/// Call order per message: `begin_tuple`, then per element `begin_element`,
/// primitive writes, `end_element`, finally `end_tuple`.
pub trait Serializer {
    /// True for untyped human-readable output, false for the compact
    /// typed-prefixed form.
    fn human_readable(&self) -> bool;

    fn begin_tuple(&mut self, types: &TypeIdList) -> SerialResult<()>;
    fn end_tuple(&mut self) -> SerialResult<()>;
    fn begin_element(&mut self, id: TypeId) -> SerialResult<()>;
    fn end_element(&mut self) -> SerialResult<()>;

    fn write_unit(&mut self) -> SerialResult<()>;
    fn write_bool(&mut self, v: bool) -> SerialResult<()>;
    fn write_i8(&mut self, v: i8) -> SerialResult<()>;
    fn write_i16(&mut self, v: i16) -> SerialResult<()>;
    fn write_i32(&mut self, v: i32) -> SerialResult<()>;
    fn write_i64(&mut self, v: i64) -> SerialResult<()>;
    fn write_u8(&mut self, v: u8) -> SerialResult<()>;
    fn write_u16(&mut self, v: u16) -> SerialResult<()>;
    fn write_u32(&mut self, v: u32) -> SerialResult<()>;
    fn write_u64(&mut self, v: u64) -> SerialResult<()>;
    fn write_f32(&mut self, v: f32) -> SerialResult<()>;
    fn write_f64(&mut self, v: f64) -> SerialResult<()>;
    fn write_str(&mut self, v: &str) -> SerialResult<()>;
}

/// Structural source for loading a message.
///
/// `begin_tuple` returns the authoritative shape of the tuple being read:
/// the typed binary form reads it from the stream (cross-checking `expected`
/// when supplied), the human-readable form requires `expected` because the
/// stream itself is untyped.
pub trait Deserializer {
    /// Mirrors [`Serializer::human_readable`].
    fn human_readable(&self) -> bool;

    fn begin_tuple(&mut self, expected: Option<&TypeIdList>) -> SerialResult<TypeIdList>;
    fn end_tuple(&mut self) -> SerialResult<()>;
    fn begin_element(&mut self) -> SerialResult<()>;
    fn end_element(&mut self) -> SerialResult<()>;

    fn read_unit(&mut self) -> SerialResult<()>;
    fn read_bool(&mut self) -> SerialResult<bool>;
    fn read_i8(&mut self) -> SerialResult<i8>;
    fn read_i16(&mut self) -> SerialResult<i16>;
    fn read_i32(&mut self) -> SerialResult<i32>;
    fn read_i64(&mut self) -> SerialResult<i64>;
    fn read_u8(&mut self) -> SerialResult<u8>;
    fn read_u16(&mut self) -> SerialResult<u16>;
    fn read_u32(&mut self) -> SerialResult<u32>;
    fn read_u64(&mut self) -> SerialResult<u64>;
    fn read_f32(&mut self) -> SerialResult<f32>;
    fn read_f64(&mut self) -> SerialResult<f64>;
    fn read_str(&mut self) -> SerialResult<String>;
}
