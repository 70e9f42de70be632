//! Human-readable untyped codec.
//!
//! Renders a message as a parenthesized, comma-separated value list:
//! `(42, "hi", true)`. The stream carries no type information, so loading
//! requires the caller to supply the expected shape.

use std::fmt::Write as _;
use types::{Deserializer, SerialError, SerialResult, Serializer, TypeId, TypeIdList};

/// Serializer producing the human-readable form.
#[derive(Debug, Default)]
pub struct TextSerializer {
    out: String,
    elements: usize,
}

impl TextSerializer {
    pub fn new() -> TextSerializer {
        TextSerializer::default()
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn into_string(self) -> String {
        self.out
    }

    fn push_value(&mut self, value: impl std::fmt::Display) -> SerialResult<()> {
        // Writing to a String cannot fail.
        let _ = write!(self.out, "{value}");
        Ok(())
    }
}

impl Serializer for TextSerializer {
    fn human_readable(&self) -> bool {
        true
    }

    fn begin_tuple(&mut self, _types: &TypeIdList) -> SerialResult<()> {
        self.out.push('(');
        self.elements = 0;
        Ok(())
    }

    fn end_tuple(&mut self) -> SerialResult<()> {
        self.out.push(')');
        Ok(())
    }

    fn begin_element(&mut self, _id: TypeId) -> SerialResult<()> {
        if self.elements > 0 {
            self.out.push_str(", ");
        }
        self.elements += 1;
        Ok(())
    }

    fn end_element(&mut self) -> SerialResult<()> {
        Ok(())
    }

    fn write_unit(&mut self) -> SerialResult<()> {
        self.out.push_str("()");
        Ok(())
    }

    fn write_bool(&mut self, v: bool) -> SerialResult<()> {
        self.push_value(v)
    }

    fn write_i8(&mut self, v: i8) -> SerialResult<()> {
        self.push_value(v)
    }

    fn write_i16(&mut self, v: i16) -> SerialResult<()> {
        self.push_value(v)
    }

    fn write_i32(&mut self, v: i32) -> SerialResult<()> {
        self.push_value(v)
    }

    fn write_i64(&mut self, v: i64) -> SerialResult<()> {
        self.push_value(v)
    }

    fn write_u8(&mut self, v: u8) -> SerialResult<()> {
        self.push_value(v)
    }

    fn write_u16(&mut self, v: u16) -> SerialResult<()> {
        self.push_value(v)
    }

    fn write_u32(&mut self, v: u32) -> SerialResult<()> {
        self.push_value(v)
    }

    fn write_u64(&mut self, v: u64) -> SerialResult<()> {
        self.push_value(v)
    }

    fn write_f32(&mut self, v: f32) -> SerialResult<()> {
        // {:?} renders the shortest round-trippable decimal form.
        let _ = write!(self.out, "{v:?}");
        Ok(())
    }

    fn write_f64(&mut self, v: f64) -> SerialResult<()> {
        let _ = write!(self.out, "{v:?}");
        Ok(())
    }

    fn write_str(&mut self, v: &str) -> SerialResult<()> {
        self.out.push('"');
        for c in v.chars() {
            match c {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\t' => self.out.push_str("\\t"),
                '\r' => self.out.push_str("\\r"),
                other => self.out.push(other),
            }
        }
        self.out.push('"');
        Ok(())
    }
}

/// Deserializer consuming the human-readable form.
#[derive(Debug)]
pub struct TextDeserializer<'a> {
    input: &'a str,
    pos: usize,
    elements: usize,
}

impl<'a> TextDeserializer<'a> {
    pub fn new(input: &'a str) -> TextDeserializer<'a> {
        TextDeserializer {
            input,
            pos: 0,
            elements: 0,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn expect_char(&mut self, want: char) -> SerialResult<()> {
        match self.rest().chars().next() {
            Some(c) if c == want => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(c) => Err(SerialError::malformed(
                self.pos,
                format!("expected '{want}', found '{c}'"),
            )),
            None => Err(SerialError::unexpected_eof(1, self.pos, "closing delimiter")),
        }
    }

    /// The next scalar token: everything up to a comma, closing paren, or
    /// whitespace.
    fn next_token(&mut self) -> SerialResult<&'a str> {
        self.skip_ws();
        let rest = self.rest();
        let end = rest
            .find(|c: char| c == ',' || c == ')' || c.is_whitespace())
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(SerialError::malformed(self.pos, "expected a value"));
        }
        self.pos += end;
        Ok(&rest[..end])
    }

    fn parse_scalar<T: std::str::FromStr>(&mut self, what: &str) -> SerialResult<T> {
        let offset = self.pos;
        let token = self.next_token()?;
        token
            .parse()
            .map_err(|_| SerialError::malformed(offset, format!("invalid {what}: '{token}'")))
    }
}

impl Deserializer for TextDeserializer<'_> {
    fn human_readable(&self) -> bool {
        true
    }

    fn begin_tuple(&mut self, expected: Option<&TypeIdList>) -> SerialResult<TypeIdList> {
        let types = expected
            .ok_or(SerialError::Unsupported {
                what: "loading a human-readable stream without an expected type sequence",
            })?
            .clone();
        self.skip_ws();
        self.expect_char('(')?;
        self.elements = 0;
        Ok(types)
    }

    fn end_tuple(&mut self) -> SerialResult<()> {
        self.skip_ws();
        self.expect_char(')')
    }

    fn begin_element(&mut self) -> SerialResult<()> {
        self.skip_ws();
        if self.elements > 0 {
            self.expect_char(',')?;
            self.skip_ws();
        }
        self.elements += 1;
        Ok(())
    }

    fn end_element(&mut self) -> SerialResult<()> {
        Ok(())
    }

    fn read_unit(&mut self) -> SerialResult<()> {
        self.skip_ws();
        self.expect_char('(')?;
        self.skip_ws();
        self.expect_char(')')
    }

    fn read_bool(&mut self) -> SerialResult<bool> {
        self.parse_scalar("bool")
    }

    fn read_i8(&mut self) -> SerialResult<i8> {
        self.parse_scalar("i8")
    }

    fn read_i16(&mut self) -> SerialResult<i16> {
        self.parse_scalar("i16")
    }

    fn read_i32(&mut self) -> SerialResult<i32> {
        self.parse_scalar("i32")
    }

    fn read_i64(&mut self) -> SerialResult<i64> {
        self.parse_scalar("i64")
    }

    fn read_u8(&mut self) -> SerialResult<u8> {
        self.parse_scalar("u8")
    }

    fn read_u16(&mut self) -> SerialResult<u16> {
        self.parse_scalar("u16")
    }

    fn read_u32(&mut self) -> SerialResult<u32> {
        self.parse_scalar("u32")
    }

    fn read_u64(&mut self) -> SerialResult<u64> {
        self.parse_scalar("u64")
    }

    fn read_f32(&mut self) -> SerialResult<f32> {
        self.parse_scalar("f32")
    }

    fn read_f64(&mut self) -> SerialResult<f64> {
        self.parse_scalar("f64")
    }

    fn read_str(&mut self) -> SerialResult<String> {
        self.skip_ws();
        self.expect_char('"')?;
        let mut out = String::new();
        let mut chars = self.rest().char_indices();
        loop {
            let Some((idx, c)) = chars.next() else {
                return Err(SerialError::unexpected_eof(1, self.input.len(), "string literal"));
            };
            match c {
                '"' => {
                    self.pos += idx + 1;
                    return Ok(out);
                }
                '\\' => {
                    let Some((_, esc)) = chars.next() else {
                        return Err(SerialError::unexpected_eof(
                            1,
                            self.input.len(),
                            "escape sequence",
                        ));
                    };
                    match esc {
                        '"' => out.push('"'),
                        '\\' => out.push('\\'),
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        other => {
                            return Err(SerialError::malformed(
                                self.pos + idx,
                                format!("unknown escape '\\{other}'"),
                            ))
                        }
                    }
                }
                other => out.push(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{make_message, Message};

    #[test]
    fn renders_parenthesized_value_list() {
        let msg = make_message!(42i64, "hi".to_string(), true);
        let mut sink = TextSerializer::new();
        msg.save(&mut sink).unwrap();
        assert_eq!(sink.as_str(), r#"(42, "hi", true)"#);
    }

    #[test]
    fn round_trip_requires_expected_shape() {
        let original = make_message!(-7i32, 1.5f64, "a \"quoted\"\nline".to_string());
        let mut sink = TextSerializer::new();
        original.save(&mut sink).unwrap();
        let text = sink.into_string();

        let mut source = TextDeserializer::new(&text);
        let err = Message::load(&mut source, None).err().unwrap();
        assert!(matches!(
            err,
            crate::MessageError::Serial(SerialError::Unsupported { .. })
        ));

        let types = original.types();
        let mut source = TextDeserializer::new(&text);
        let loaded = Message::load(&mut source, Some(&types)).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn floats_survive_the_text_form() {
        let original = make_message!(f64::NAN, f64::INFINITY, 0.1f64);
        let mut sink = TextSerializer::new();
        original.save(&mut sink).unwrap();

        let types = original.types();
        let mut source = TextDeserializer::new(sink.as_str());
        let loaded = Message::load(&mut source, Some(&types)).unwrap();
        assert!(loaded.get_as::<f64>(0).unwrap().is_nan());
        assert_eq!(loaded.get_as::<f64>(1), Some(&f64::INFINITY));
        assert_eq!(loaded.get_as::<f64>(2), Some(&0.1));
    }

    #[test]
    fn tolerates_extra_whitespace() {
        let types = make_message!(1u32, false).types();
        let mut source = TextDeserializer::new("  ( 1 ,  false )  ");
        let loaded = Message::load(&mut source, Some(&types)).unwrap();
        assert_eq!(loaded.get_as::<u32>(0), Some(&1));
        assert_eq!(loaded.get_as::<bool>(1), Some(&false));
    }

    #[test]
    fn bad_scalar_reports_offset() {
        let types = make_message!(5i64).types();
        let mut source = TextDeserializer::new("(banana)");
        let err = Message::load(&mut source, Some(&types)).err().unwrap();
        match err {
            crate::MessageError::Serial(SerialError::Malformed { offset, .. }) => {
                assert_eq!(offset, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unterminated_string_is_eof() {
        let types = make_message!(String::new()).types();
        let mut source = TextDeserializer::new("(\"oops");
        let err = Message::load(&mut source, Some(&types)).err().unwrap();
        assert!(matches!(
            err,
            crate::MessageError::Serial(SerialError::UnexpectedEof { .. })
        ));
    }
}
