//! Wire codecs for messages.
//!
//! Two interchangeable formats sit behind the same structural traits: a
//! compact typed-prefixed binary form for transport and a human-readable
//! text form for logs and fixtures.

mod binary;
mod text;

pub use binary::{BinaryDeserializer, BinarySerializer};
pub use text::{TextDeserializer, TextSerializer};
