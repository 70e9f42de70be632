//! Property tests for wildcard matching.

use dispatch::{Pattern, PatternAtom};
use message::MessageBuilder;
use proptest::prelude::*;
use types::registry;

proptest! {
    /// A pattern alternating wildcards with concrete slots matches a
    /// message formed by inserting arbitrary padding at each wildcard span,
    /// and the mapping points at exactly the concrete elements.
    #[test]
    fn wildcards_absorb_arbitrary_padding(
        pads in prop::collection::vec(prop::collection::vec(any::<bool>(), 0..3), 1..6),
    ) {
        let value_count = pads.len() - 1;
        let i64_id = registry::expect_type_id::<i64>();

        let mut atoms = vec![PatternAtom::Any];
        let mut builder = MessageBuilder::new();
        let mut expected = Vec::with_capacity(value_count);
        let mut pos = 0usize;
        for (i, pad) in pads.iter().enumerate() {
            for &b in pad {
                builder.append(b);
                pos += 1;
            }
            if i < value_count {
                builder.append(i as i64);
                expected.push(pos);
                pos += 1;
                atoms.push(PatternAtom::Ty(i64_id));
                atoms.push(PatternAtom::Any);
            }
        }

        let pattern = Pattern::compile(atoms);
        let msg = builder.move_to_message().unwrap();
        prop_assert!(pattern.matches_shape(&msg));
        prop_assert_eq!(pattern.match_mapping(&msg), Some(expected));
    }

    /// A concrete pattern never matches a message whose shape differs.
    #[test]
    fn concrete_patterns_reject_shorter_messages(n in 1usize..6) {
        let i64_id = registry::expect_type_id::<i64>();
        let pattern = Pattern::compile(vec![PatternAtom::Ty(i64_id); n]);

        let mut builder = MessageBuilder::new();
        for i in 0..n - 1 {
            builder.append(i as i64);
        }
        let short = builder.move_to_message().unwrap();
        prop_assert!(pattern.match_mapping(&short).is_none());
    }
}
