//! The trait a Rust type implements to become a message element.

use crate::serial::{Deserializer, SerialResult, Serializer};
use std::fmt;

/// A value that can live inside a message.
///
/// Elements are cloned on copy-on-write unsharing, compared element-wise for
/// message equality, stringified for diagnostics, and moved through the
/// structural codec surface for persistence. Registration additionally
/// requires `Default` so that deserialization can construct a fresh value
/// before loading into it.
pub trait Element: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Writes this value through the structural sink.
    fn save(&self, sink: &mut dyn Serializer) -> SerialResult<()>;

    /// Replaces this value with one read from the structural source.
    fn load(&mut self, source: &mut dyn Deserializer) -> SerialResult<()>;
}

macro_rules! primitive_element {
    ($ty:ty, $write:ident, $read:ident) => {
        impl Element for $ty {
            fn save(&self, sink: &mut dyn Serializer) -> SerialResult<()> {
                sink.$write(*self)
            }

            fn load(&mut self, source: &mut dyn Deserializer) -> SerialResult<()> {
                *self = source.$read()?;
                Ok(())
            }
        }
    };
}

primitive_element!(bool, write_bool, read_bool);
primitive_element!(i8, write_i8, read_i8);
primitive_element!(i16, write_i16, read_i16);
primitive_element!(i32, write_i32, read_i32);
primitive_element!(i64, write_i64, read_i64);
primitive_element!(u8, write_u8, read_u8);
primitive_element!(u16, write_u16, read_u16);
primitive_element!(u32, write_u32, read_u32);
primitive_element!(u64, write_u64, read_u64);
primitive_element!(f32, write_f32, read_f32);
primitive_element!(f64, write_f64, read_f64);

impl Element for () {
    fn save(&self, sink: &mut dyn Serializer) -> SerialResult<()> {
        sink.write_unit()
    }

    fn load(&mut self, source: &mut dyn Deserializer) -> SerialResult<()> {
        source.read_unit()
    }
}

impl Element for String {
    fn save(&self, sink: &mut dyn Serializer) -> SerialResult<()> {
        sink.write_str(self)
    }

    fn load(&mut self, source: &mut dyn Deserializer) -> SerialResult<()> {
        *self = source.read_str()?;
        Ok(())
    }
}
