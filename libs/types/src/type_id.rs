//! Small-integer type identity.
//!
//! Every element type carried by a message is identified by a `TypeId`.
//! Builtin types occupy a fixed low range so that their ids are stable across
//! processes; custom types are assigned ids from `FIRST_CUSTOM_TYPE_ID`
//! upward in registration order.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// First id handed out to custom (non-builtin) types.
pub const FIRST_CUSTOM_TYPE_ID: u16 = 64;

/// Identifies an element's concrete type via the global metadata registry.
///
/// Id 0 is reserved and never names a live element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u16);

impl TypeId {
    /// The reserved invalid id.
    pub const INVALID: TypeId = TypeId(0);

    /// Wraps a raw id value.
    pub const fn from_raw(raw: u16) -> Self {
        TypeId(raw)
    }

    /// The raw id value.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// True if this id falls into the builtin range.
    pub const fn is_builtin(self) -> bool {
        self.0 != 0 && self.0 < FIRST_CUSTOM_TYPE_ID
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<BuiltinType> for TypeId {
    fn from(b: BuiltinType) -> Self {
        TypeId(b.into())
    }
}

/// Builtin element types with fixed, process-independent ids.
///
/// The numbering leaves room below `FIRST_CUSTOM_TYPE_ID` for future
/// builtins without renumbering custom registrations.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum BuiltinType {
    Unit = 1,
    Bool = 2,
    I8 = 3,
    I16 = 4,
    I32 = 5,
    I64 = 6,
    U8 = 7,
    U16 = 8,
    U32 = 9,
    U64 = 10,
    F32 = 11,
    F64 = 12,
    Str = 13,
}

impl BuiltinType {
    /// Human-readable name used in stringified type sequences.
    pub fn name(self) -> &'static str {
        match self {
            BuiltinType::Unit => "unit",
            BuiltinType::Bool => "bool",
            BuiltinType::I8 => "i8",
            BuiltinType::I16 => "i16",
            BuiltinType::I32 => "i32",
            BuiltinType::I64 => "i64",
            BuiltinType::U8 => "u8",
            BuiltinType::U16 => "u16",
            BuiltinType::U32 => "u32",
            BuiltinType::U64 => "u64",
            BuiltinType::F32 => "f32",
            BuiltinType::F64 => "f64",
            BuiltinType::Str => "str",
        }
    }
}
