//! # Quiver Type System
//!
//! ## Purpose
//!
//! Process-wide type identity for message elements: small-integer type ids,
//! a global metadata registry of type-erased operation tables, interned
//! immutable type-id sequences, and the fast-comparison type token derived
//! from them. Everything that stores or matches a message resolves element
//! types through this crate.
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → libs/message → libs/dispatch
//!     ↑             ↓               ↓
//! Type ids     Packed COW       Pattern matching
//! Metadata     storage and      and behavior
//! Registry     builders         dispatch
//! ```
//!
//! ## What This Crate Contains
//! - **TypeId / BuiltinType**: small-integer identity for element types
//! - **TypeMeta registry**: per-type function-pointer tables (construct,
//!   destroy, copy, move, compare, stringify, save, load) keyed by `TypeId`
//! - **TypeIdList**: interned, immutable ordered id sequences
//! - **TypeToken**: deterministic scalar summary of a type sequence
//! - **Element**: the trait a Rust type implements to become a message element
//! - **Serializer / Deserializer**: the structural-callback codec surface
//!
//! ## What This Crate Does NOT Contain
//! - Message storage or views (libs/message)
//! - Pattern matching or dispatch (libs/dispatch)
//! - Any concrete wire format (codec implementations live in libs/message)

pub mod element;
pub mod error;
pub mod registry;
pub mod serial;
pub mod token;
pub mod type_id;
pub mod type_id_list;

pub use element::Element;
pub use error::{TypeError, TypeResult};
pub use registry::TypeMeta;
pub use serial::{Deserializer, SerialError, SerialResult, Serializer};
pub use token::TypeToken;
pub use type_id::{BuiltinType, TypeId, FIRST_CUSTOM_TYPE_ID};
pub use type_id_list::TypeIdList;
