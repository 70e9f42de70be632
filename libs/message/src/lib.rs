//! Copy-on-write message tuples
//!
//! ## Purpose
//!
//! The value type carried between behaviors: a fixed-length, type-erased,
//! immutable-by-default tuple. Handles copy in O(1) by bumping an atomic
//! reference count; mutation unshares first, so concurrent readers never
//! observe writes. Slicing and splicing build zero-copy views over existing
//! storage, and a builder assembles messages whose shape is only known at
//! runtime.
//!
//! ## Architecture Role
//!
//! ```text
//! ┌────────────────┐    register    ┌────────────────┐
//! │     types      │◄───────────────│    message     │
//! │  registry +    │    meta_of     │  Message, COW  │
//! │  type tokens   │───────────────►│  views, codec  │
//! └────────────────┘                └───────┬────────┘
//!                                           │ token / get_as
//!                                           ▼
//!                                   ┌────────────────┐
//!                                   │    dispatch    │
//!                                   │ behavior match │
//!                                   └────────────────┘
//! ```
//!
//! Construction paths:
//! - [`make_message!`] / [`Message::from_values`] for statically known
//!   shapes (eligible for dispatch-side shape caching),
//! - [`MessageBuilder`] and [`Message::load`] for runtime shapes (flagged
//!   dynamically typed, matched exactly and never cached).

pub mod builder;
pub mod codec;
mod concat;
mod data;
mod decorated;
pub mod error;
mod handle;

pub use builder::MessageBuilder;
pub use codec::{BinaryDeserializer, BinarySerializer, TextDeserializer, TextSerializer};
pub use data::MessageData;
pub use error::{MessageError, MessageResult};
pub use handle::{IntoMessage, Message, ValueMatcher};

/// Builds a statically-shaped [`Message`] from a list of values.
///
/// All element types must be registered; construction failure here is a
/// programming error, so the expansion panics rather than returning a
/// `Result`. Use [`MessageBuilder`] for fallible, runtime-shaped
/// construction.
///
/// ```
/// use message::make_message;
///
/// let msg = make_message!(42i64, "hello".to_string());
/// assert_eq!(msg.get_as::<i64>(0), Some(&42));
/// ```
#[macro_export]
macro_rules! make_message {
    () => {
        $crate::Message::default()
    };
    ($($value:expr),+ $(,)?) => {
        match $crate::Message::from_values(($($value,)+)) {
            Ok(msg) => msg,
            Err(err) => panic!("message construction failed: {err}"),
        }
    };
}
