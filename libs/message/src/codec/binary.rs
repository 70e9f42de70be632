//! Compact typed-prefixed binary codec.
//!
//! Layout: element count (u16), then one u16 type id per element, then the
//! element payloads back to back. All integers little-endian; strings are
//! u32-length-prefixed UTF-8. The typed prefix makes the stream
//! self-describing, so loading does not require a caller-supplied shape
//! (one may still be passed for cross-checking).

use byteorder::{ByteOrder, LittleEndian};
use types::{registry, Deserializer, SerialError, SerialResult, Serializer, TypeId, TypeIdList};

/// Serializer producing the compact binary form.
#[derive(Debug, Default)]
pub struct BinarySerializer {
    buf: Vec<u8>,
}

impl BinarySerializer {
    pub fn new() -> BinarySerializer {
        BinarySerializer::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl Serializer for BinarySerializer {
    fn human_readable(&self) -> bool {
        false
    }

    fn begin_tuple(&mut self, types: &TypeIdList) -> SerialResult<()> {
        if types.len() > usize::from(u16::MAX) {
            return Err(SerialError::Unsupported {
                what: "tuples longer than 65535 elements",
            });
        }
        self.buf.extend_from_slice(&(types.len() as u16).to_le_bytes());
        for &id in types.ids() {
            self.buf.extend_from_slice(&id.raw().to_le_bytes());
        }
        Ok(())
    }

    fn end_tuple(&mut self) -> SerialResult<()> {
        Ok(())
    }

    fn begin_element(&mut self, _id: TypeId) -> SerialResult<()> {
        Ok(())
    }

    fn end_element(&mut self) -> SerialResult<()> {
        Ok(())
    }

    fn write_unit(&mut self) -> SerialResult<()> {
        Ok(())
    }

    fn write_bool(&mut self, v: bool) -> SerialResult<()> {
        self.buf.push(v as u8);
        Ok(())
    }

    fn write_i8(&mut self, v: i8) -> SerialResult<()> {
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn write_i16(&mut self, v: i16) -> SerialResult<()> {
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn write_i32(&mut self, v: i32) -> SerialResult<()> {
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn write_i64(&mut self, v: i64) -> SerialResult<()> {
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn write_u8(&mut self, v: u8) -> SerialResult<()> {
        self.buf.push(v);
        Ok(())
    }

    fn write_u16(&mut self, v: u16) -> SerialResult<()> {
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn write_u32(&mut self, v: u32) -> SerialResult<()> {
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn write_u64(&mut self, v: u64) -> SerialResult<()> {
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn write_f32(&mut self, v: f32) -> SerialResult<()> {
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn write_f64(&mut self, v: f64) -> SerialResult<()> {
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn write_str(&mut self, v: &str) -> SerialResult<()> {
        if v.len() > u32::MAX as usize {
            return Err(SerialError::Unsupported {
                what: "strings longer than u32::MAX bytes",
            });
        }
        self.buf.extend_from_slice(&(v.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(v.as_bytes());
        Ok(())
    }
}

/// Deserializer consuming the compact binary form.
#[derive(Debug)]
pub struct BinaryDeserializer<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BinaryDeserializer<'a> {
    pub fn new(buf: &'a [u8]) -> BinaryDeserializer<'a> {
        BinaryDeserializer { buf, pos: 0 }
    }

    /// Bytes not yet consumed; a stream may carry data beyond one message.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize, context: &'static str) -> SerialResult<&'a [u8]> {
        match self.buf.get(self.pos..self.pos + n) {
            Some(slice) => {
                self.pos += n;
                Ok(slice)
            }
            None => Err(SerialError::unexpected_eof(
                n - (self.buf.len() - self.pos),
                self.pos,
                context,
            )),
        }
    }
}

impl Deserializer for BinaryDeserializer<'_> {
    fn human_readable(&self) -> bool {
        false
    }

    fn begin_tuple(&mut self, expected: Option<&TypeIdList>) -> SerialResult<TypeIdList> {
        let count = LittleEndian::read_u16(self.take(2, "element count")?) as usize;
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let raw = LittleEndian::read_u16(self.take(2, "type id sequence")?);
            let id = TypeId::from_raw(raw);
            if registry::lookup(id).is_none() {
                return Err(SerialError::UnknownType { type_id: raw });
            }
            ids.push(id);
        }
        let types = TypeIdList::intern(&ids);
        if let Some(expected) = expected {
            if *expected != types {
                return Err(SerialError::TypeSequenceMismatch {
                    expected: expected.to_string(),
                    got: types.to_string(),
                });
            }
        }
        Ok(types)
    }

    fn end_tuple(&mut self) -> SerialResult<()> {
        Ok(())
    }

    fn begin_element(&mut self) -> SerialResult<()> {
        Ok(())
    }

    fn end_element(&mut self) -> SerialResult<()> {
        Ok(())
    }

    fn read_unit(&mut self) -> SerialResult<()> {
        Ok(())
    }

    fn read_bool(&mut self) -> SerialResult<bool> {
        let byte = self.take(1, "bool")?[0];
        match byte {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SerialError::malformed(
                self.pos - 1,
                format!("invalid bool byte {other:#04x}"),
            )),
        }
    }

    fn read_i8(&mut self) -> SerialResult<i8> {
        Ok(self.take(1, "i8")?[0] as i8)
    }

    fn read_i16(&mut self) -> SerialResult<i16> {
        Ok(LittleEndian::read_i16(self.take(2, "i16")?))
    }

    fn read_i32(&mut self) -> SerialResult<i32> {
        Ok(LittleEndian::read_i32(self.take(4, "i32")?))
    }

    fn read_i64(&mut self) -> SerialResult<i64> {
        Ok(LittleEndian::read_i64(self.take(8, "i64")?))
    }

    fn read_u8(&mut self) -> SerialResult<u8> {
        Ok(self.take(1, "u8")?[0])
    }

    fn read_u16(&mut self) -> SerialResult<u16> {
        Ok(LittleEndian::read_u16(self.take(2, "u16")?))
    }

    fn read_u32(&mut self) -> SerialResult<u32> {
        Ok(LittleEndian::read_u32(self.take(4, "u32")?))
    }

    fn read_u64(&mut self) -> SerialResult<u64> {
        Ok(LittleEndian::read_u64(self.take(8, "u64")?))
    }

    fn read_f32(&mut self) -> SerialResult<f32> {
        Ok(LittleEndian::read_f32(self.take(4, "f32")?))
    }

    fn read_f64(&mut self) -> SerialResult<f64> {
        Ok(LittleEndian::read_f64(self.take(8, "f64")?))
    }

    fn read_str(&mut self) -> SerialResult<String> {
        let len = LittleEndian::read_u32(self.take(4, "string length")?) as usize;
        let offset = self.pos;
        let bytes = self.take(len, "string payload")?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| SerialError::malformed(offset, format!("invalid UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{make_message, Message};

    #[test]
    fn round_trip_preserves_values_and_shape() {
        let original = make_message!(-42i64, "caffè".to_string(), true, 0.25f32);
        let mut sink = BinarySerializer::new();
        original.save(&mut sink).unwrap();

        let mut source = BinaryDeserializer::new(sink.as_bytes());
        let loaded = Message::load(&mut source, None).unwrap();
        assert_eq!(source.remaining(), 0);
        assert_eq!(loaded, original);
        assert!(loaded.types().ptr_eq(&original.types()));
        assert!(loaded.is_dynamically_typed());
    }

    #[test]
    fn expected_shape_cross_checks_typed_prefix() {
        let msg = make_message!(1u16, 2u16);
        let mut sink = BinarySerializer::new();
        msg.save(&mut sink).unwrap();

        let wrong = make_message!(1u16, false).types();
        let mut source = BinaryDeserializer::new(sink.as_bytes());
        let err = Message::load(&mut source, Some(&wrong)).err().unwrap();
        assert!(matches!(
            err,
            crate::MessageError::Serial(SerialError::TypeSequenceMismatch { .. })
        ));
    }

    #[test]
    fn unknown_type_id_in_prefix_is_rejected() {
        // One element whose id falls in the never-assigned gap below the
        // custom range.
        let buf = [1u8, 0, 60, 0];
        let mut source = BinaryDeserializer::new(&buf);
        let err = source.begin_tuple(None).err().unwrap();
        assert!(matches!(err, SerialError::UnknownType { type_id: 60 }));
    }

    #[test]
    fn truncated_payload_reports_eof_with_context() {
        let msg = make_message!(123456789i64);
        let mut sink = BinarySerializer::new();
        msg.save(&mut sink).unwrap();
        let bytes = sink.into_bytes();

        let mut source = BinaryDeserializer::new(&bytes[..bytes.len() - 3]);
        let err = Message::load(&mut source, None).err().unwrap();
        assert!(matches!(
            err,
            crate::MessageError::Serial(SerialError::UnexpectedEof { context: "i64", .. })
        ));
    }

    #[test]
    fn invalid_bool_byte_is_malformed() {
        let msg = make_message!(true);
        let mut sink = BinarySerializer::new();
        msg.save(&mut sink).unwrap();
        let mut bytes = sink.into_bytes();
        *bytes.last_mut().unwrap() = 7;

        let mut source = BinaryDeserializer::new(&bytes);
        let err = Message::load(&mut source, None).err().unwrap();
        assert!(matches!(
            err,
            crate::MessageError::Serial(SerialError::Malformed { .. })
        ));
    }

    #[test]
    fn empty_message_round_trips() {
        let empty = Message::default();
        let mut sink = BinarySerializer::new();
        empty.save(&mut sink).unwrap();
        assert_eq!(sink.as_bytes(), [0u8, 0]);

        let mut source = BinaryDeserializer::new(sink.as_bytes());
        let loaded = Message::load(&mut source, None).unwrap();
        assert!(loaded.is_empty());
    }
}
