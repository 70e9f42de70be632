//! Property tests: any message survives both wire formats.

use message::{
    BinaryDeserializer, BinarySerializer, Message, MessageBuilder, TextDeserializer,
    TextSerializer,
};
use proptest::prelude::*;

/// One arbitrary element appended to a builder.
#[derive(Debug, Clone)]
enum Value {
    Bool(bool),
    I64(i64),
    U32(u32),
    F64(f64),
    Str(String),
}

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::I64),
        any::<u32>().prop_map(Value::U32),
        // Finite floats only; NaN breaks the equality check, not the codec.
        prop::num::f64::NORMAL.prop_map(Value::F64),
        // Include the characters the text form has to escape.
        "[a-z \"\\\\\n\t]{0,24}".prop_map(Value::Str),
    ]
}

fn build(values: &[Value]) -> Message {
    let mut builder = MessageBuilder::with_capacity(values.len());
    for value in values {
        match value.clone() {
            Value::Bool(v) => builder.append(v),
            Value::I64(v) => builder.append(v),
            Value::U32(v) => builder.append(v),
            Value::F64(v) => builder.append(v),
            Value::Str(v) => builder.append(v),
        };
    }
    builder.move_to_message().unwrap()
}

proptest! {
    #[test]
    fn binary_round_trip(values in prop::collection::vec(value_strategy(), 0..8)) {
        let original = build(&values);
        let mut sink = BinarySerializer::new();
        original.save(&mut sink).unwrap();

        let mut source = BinaryDeserializer::new(sink.as_bytes());
        let loaded = Message::load(&mut source, None).unwrap();
        prop_assert_eq!(source.remaining(), 0);
        prop_assert_eq!(&loaded, &original);
        prop_assert_eq!(loaded.token(), original.token());
    }

    #[test]
    fn text_round_trip(values in prop::collection::vec(value_strategy(), 0..8)) {
        let original = build(&values);
        let mut sink = TextSerializer::new();
        original.save(&mut sink).unwrap();

        let types = original.types();
        let mut source = TextDeserializer::new(sink.as_str());
        let loaded = Message::load(&mut source, Some(&types)).unwrap();
        prop_assert_eq!(&loaded, &original);
    }

    #[test]
    fn binary_rejects_any_truncation(values in prop::collection::vec(value_strategy(), 1..6)) {
        let original = build(&values);
        let mut sink = BinarySerializer::new();
        original.save(&mut sink).unwrap();
        let bytes = sink.into_bytes();

        // Cutting the stream anywhere short of the end must fail cleanly.
        for cut in 0..bytes.len() {
            let mut source = BinaryDeserializer::new(&bytes[..cut]);
            prop_assert!(Message::load(&mut source, None).is_err());
        }
    }
}
