//! Fast-comparison summary of a type sequence.

use crate::type_id::TypeId;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// A deterministic scalar summarizing an ordered type sequence.
///
/// Two sequences with identical element types in identical order always
/// produce the same token. Token equality is a fast-path filter only; exact
/// id-by-id comparison (or interned-list pointer identity) remains the
/// authority wherever a wrong answer would be observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeToken(u64);

impl TypeToken {
    /// Token of the empty sequence; fold ids onto this seed.
    pub const SEED: TypeToken = TypeToken(FNV_OFFSET);

    /// Folds one more type id into the running token.
    pub const fn fold(self, id: TypeId) -> TypeToken {
        TypeToken((self.0 ^ id.raw() as u64).wrapping_mul(FNV_PRIME))
    }

    /// Computes the token of a whole sequence.
    pub fn of(ids: &[TypeId]) -> TypeToken {
        ids.iter().fold(TypeToken::SEED, |t, &id| t.fold(id))
    }

    /// The raw token value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u16]) -> Vec<TypeId> {
        raw.iter().copied().map(TypeId::from_raw).collect()
    }

    #[test]
    fn equal_sequences_equal_tokens() {
        assert_eq!(TypeToken::of(&ids(&[6, 13])), TypeToken::of(&ids(&[6, 13])));
        assert_eq!(TypeToken::of(&[]), TypeToken::SEED);
    }

    #[test]
    fn order_and_content_change_the_token() {
        assert_ne!(TypeToken::of(&ids(&[6, 13])), TypeToken::of(&ids(&[13, 6])));
        assert_ne!(TypeToken::of(&ids(&[6])), TypeToken::of(&ids(&[6, 6])));
        assert_ne!(TypeToken::of(&ids(&[6])), TypeToken::of(&[]));
    }

    #[test]
    fn folding_matches_batch_computation() {
        let seq = ids(&[2, 6, 13, 64]);
        let folded = seq.iter().fold(TypeToken::SEED, |t, &id| t.fold(id));
        assert_eq!(folded, TypeToken::of(&seq));
    }

    proptest::proptest! {
        #[test]
        fn token_of_a_sequence_extends_its_prefix_token(
            head in proptest::collection::vec(1u16..200, 0..5),
            tail in proptest::collection::vec(1u16..200, 0..5),
        ) {
            let prefix = TypeToken::of(&ids(&head));
            let extended = ids(&tail).iter().fold(prefix, |t, &id| t.fold(id));
            let mut whole = head.clone();
            whole.extend(&tail);
            proptest::prop_assert_eq!(extended, TypeToken::of(&ids(&whole)));
        }
    }
}
