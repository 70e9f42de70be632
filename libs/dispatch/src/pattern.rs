//! Pattern compilation and wildcard matching.
//!
//! ## Purpose
//!
//! A pattern is an ordered list of atoms, each either a concrete type id or
//! the wildcard. Compilation classifies the wildcard layout once, because
//! each layout has a mechanically different match routine: a concrete
//! pattern compares whole shapes, a single edge wildcard reduces to a
//! prefix or suffix check, an interior wildcard to both, and only patterns
//! with several wildcards need a backtracking search.
//!
//! A successful match yields the mapping from non-wildcard pattern slots
//! (left to right) to message element indices; the behavior layer
//! reinterprets those indices as typed handler arguments.

use message::Message;
use types::{TypeId, TypeIdList};

/// One pattern slot: a concrete element type or the wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternAtom {
    Ty(TypeId),
    Any,
}

/// Wildcard layout of a compiled pattern; selects the match routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildcardPosition {
    /// No wildcard; the shape must match exactly.
    Nil,
    /// Wildcard first; the fixed tail must match a message suffix.
    Leading,
    /// Wildcard last; the fixed head must match a message prefix.
    Trailing,
    /// Exactly one interior wildcard at this atom index.
    InBetween(usize),
    /// Two or more wildcards; matched by backtracking.
    Multiple,
}

/// A compiled, immutable match signature.
#[derive(Debug, Clone)]
pub struct Pattern {
    atoms: Box<[PatternAtom]>,
    position: WildcardPosition,
    /// Interned shape, precomputed for concrete patterns only.
    exact: Option<TypeIdList>,
    /// Number of non-wildcard atoms.
    arity: usize,
}

impl Pattern {
    pub fn compile(atoms: Vec<PatternAtom>) -> Pattern {
        let position = classify(&atoms);
        let exact = match position {
            WildcardPosition::Nil => {
                let ids: Vec<TypeId> = atoms
                    .iter()
                    .map(|atom| match atom {
                        PatternAtom::Ty(id) => *id,
                        PatternAtom::Any => unreachable!("wildcard in concrete pattern"),
                    })
                    .collect();
                Some(TypeIdList::intern(&ids))
            }
            _ => None,
        };
        let arity = atoms
            .iter()
            .filter(|atom| matches!(atom, PatternAtom::Ty(_)))
            .count();
        Pattern {
            atoms: atoms.into_boxed_slice(),
            position,
            exact,
            arity,
        }
    }

    pub fn position(&self) -> WildcardPosition {
        self.position
    }

    pub fn atoms(&self) -> &[PatternAtom] {
        &self.atoms
    }

    /// Number of handler arguments a match of this pattern produces.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Type-compatibility check without producing a mapping; this is what
    /// the dispatch cache precomputes per message shape.
    pub fn matches_shape(&self, msg: &Message) -> bool {
        let types = msg.types();
        let ids = types.ids();
        match self.position {
            WildcardPosition::Nil => {
                let exact = self.exact.as_ref().expect("concrete pattern without shape");
                if !msg.is_dynamically_typed() {
                    // Interned lists make pointer identity authoritative.
                    return exact.ptr_eq(&types);
                }
                exact == &types
            }
            WildcardPosition::Trailing => {
                let head = &self.atoms[..self.atoms.len() - 1];
                ids.len() >= head.len() && atoms_eq(head, &ids[..head.len()])
            }
            WildcardPosition::Leading => {
                let tail = &self.atoms[1..];
                ids.len() >= tail.len() && atoms_eq(tail, &ids[ids.len() - tail.len()..])
            }
            WildcardPosition::InBetween(pos) => {
                let head = &self.atoms[..pos];
                let tail = &self.atoms[pos + 1..];
                ids.len() >= head.len() + tail.len()
                    && atoms_eq(head, &ids[..head.len()])
                    && atoms_eq(tail, &ids[ids.len() - tail.len()..])
            }
            WildcardPosition::Multiple => {
                ids.len() >= self.arity && {
                    let mut scratch = Vec::with_capacity(self.arity);
                    match_multiple(&self.atoms, ids, 0, &mut scratch)
                }
            }
        }
    }

    /// Exact match producing the slot-to-element mapping, or `None`.
    pub fn match_mapping(&self, msg: &Message) -> Option<Vec<usize>> {
        let types = msg.types();
        let ids = types.ids();
        match self.position {
            WildcardPosition::Nil => {
                if !self.matches_shape(msg) {
                    return None;
                }
                Some((0..ids.len()).collect())
            }
            WildcardPosition::Trailing => {
                let head = &self.atoms[..self.atoms.len() - 1];
                if ids.len() < head.len() || !atoms_eq(head, &ids[..head.len()]) {
                    return None;
                }
                Some((0..head.len()).collect())
            }
            WildcardPosition::Leading => {
                let tail = &self.atoms[1..];
                if ids.len() < tail.len() || !atoms_eq(tail, &ids[ids.len() - tail.len()..]) {
                    return None;
                }
                Some((ids.len() - tail.len()..ids.len()).collect())
            }
            WildcardPosition::InBetween(pos) => {
                let head = &self.atoms[..pos];
                let tail = &self.atoms[pos + 1..];
                if ids.len() < head.len() + tail.len()
                    || !atoms_eq(head, &ids[..head.len()])
                    || !atoms_eq(tail, &ids[ids.len() - tail.len()..])
                {
                    return None;
                }
                // The wildcard span contributes no mapped positions.
                let mut out: Vec<usize> = (0..head.len()).collect();
                out.extend(ids.len() - tail.len()..ids.len());
                Some(out)
            }
            WildcardPosition::Multiple => {
                if ids.len() < self.arity {
                    return None;
                }
                let mut out = Vec::with_capacity(self.arity);
                match_multiple(&self.atoms, ids, 0, &mut out).then_some(out)
            }
        }
    }
}

fn atoms_eq(atoms: &[PatternAtom], ids: &[TypeId]) -> bool {
    debug_assert_eq!(atoms.len(), ids.len());
    atoms
        .iter()
        .zip(ids)
        .all(|(atom, id)| matches!(atom, PatternAtom::Ty(want) if want == id))
}

fn classify(atoms: &[PatternAtom]) -> WildcardPosition {
    let wildcards: Vec<usize> = atoms
        .iter()
        .enumerate()
        .filter_map(|(i, atom)| matches!(atom, PatternAtom::Any).then_some(i))
        .collect();
    match wildcards.as_slice() {
        [] => WildcardPosition::Nil,
        [0] => WildcardPosition::Leading,
        [pos] if *pos == atoms.len() - 1 => WildcardPosition::Trailing,
        [pos] => WildcardPosition::InBetween(*pos),
        _ => WildcardPosition::Multiple,
    }
}

/// Lockstep walk with backtracking. A wildcard tentatively absorbs zero
/// elements, then one more on each failure; `out` is committed per concrete
/// match and rolled back by truncation when a tentative absorption dead-ends.
fn match_multiple(
    atoms: &[PatternAtom],
    ids: &[TypeId],
    base: usize,
    out: &mut Vec<usize>,
) -> bool {
    let Some((first, rest)) = atoms.split_first() else {
        return ids.is_empty();
    };
    match first {
        PatternAtom::Ty(want) => match ids.split_first() {
            Some((got, rest_ids)) if got == want => {
                out.push(base);
                if match_multiple(rest, rest_ids, base + 1, out) {
                    true
                } else {
                    out.pop();
                    false
                }
            }
            _ => false,
        },
        PatternAtom::Any => {
            let commit = out.len();
            for absorbed in 0..=ids.len() {
                if match_multiple(rest, &ids[absorbed..], base + absorbed, out) {
                    return true;
                }
                out.truncate(commit);
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use message::make_message;
    use types::registry;

    fn ty<T: types::Element>() -> PatternAtom {
        PatternAtom::Ty(registry::expect_type_id::<T>())
    }

    #[test]
    fn classification_covers_every_layout() {
        let id = registry::expect_type_id::<i64>();
        let t = PatternAtom::Ty(id);
        let w = PatternAtom::Any;
        let classify = |atoms: &[PatternAtom]| Pattern::compile(atoms.to_vec()).position();

        assert_eq!(classify(&[]), WildcardPosition::Nil);
        assert_eq!(classify(&[t, t]), WildcardPosition::Nil);
        assert_eq!(classify(&[w, t]), WildcardPosition::Leading);
        assert_eq!(classify(&[w]), WildcardPosition::Leading);
        assert_eq!(classify(&[t, w]), WildcardPosition::Trailing);
        assert_eq!(classify(&[t, w, t]), WildcardPosition::InBetween(1));
        assert_eq!(classify(&[w, w]), WildcardPosition::Multiple);
        assert_eq!(classify(&[w, t, w]), WildcardPosition::Multiple);
    }

    #[test]
    fn concrete_pattern_requires_exact_shape() {
        let pattern = Pattern::compile(vec![ty::<i64>(), ty::<String>()]);
        let matching = make_message!(1i64, "x".to_string());
        assert_eq!(pattern.match_mapping(&matching), Some(vec![0, 1]));
        assert!(pattern.match_mapping(&make_message!(1i64)).is_none());
        assert!(pattern
            .match_mapping(&make_message!(1i64, "x".to_string(), true))
            .is_none());
        assert!(pattern
            .match_mapping(&make_message!("x".to_string(), 1i64))
            .is_none());
    }

    #[test]
    fn interior_wildcard_maps_around_the_absorbed_span() {
        let pattern = Pattern::compile(vec![ty::<i64>(), PatternAtom::Any, ty::<String>()]);
        let msg = make_message!(7i64, 1.0f64, true, "end".to_string());
        assert_eq!(pattern.position(), WildcardPosition::InBetween(1));
        assert_eq!(pattern.match_mapping(&msg), Some(vec![0, 3]));

        // The wildcard may also absorb nothing.
        let tight = make_message!(7i64, "end".to_string());
        assert_eq!(pattern.match_mapping(&tight), Some(vec![0, 1]));

        let short = make_message!(7i64);
        assert!(pattern.match_mapping(&short).is_none());
    }

    #[test]
    fn edge_wildcards_pin_the_fixed_side() {
        let leading = Pattern::compile(vec![PatternAtom::Any, ty::<bool>()]);
        let trailing = Pattern::compile(vec![ty::<bool>(), PatternAtom::Any]);
        let msg = make_message!(true, 1i64, false);

        // Fixed suffix: the last element must be the bool.
        assert_eq!(leading.match_mapping(&msg), Some(vec![2]));
        // Fixed prefix: the first element must be the bool.
        assert_eq!(trailing.match_mapping(&msg), Some(vec![0]));

        let bare = make_message!(false);
        assert_eq!(leading.match_mapping(&bare), Some(vec![0]));
        assert_eq!(trailing.match_mapping(&bare), Some(vec![0]));
        assert!(leading.match_mapping(&make_message!(1i64)).is_none());
    }

    #[test]
    fn double_wildcard_matches_any_length() {
        let pattern = Pattern::compile(vec![PatternAtom::Any, PatternAtom::Any]);
        assert_eq!(pattern.position(), WildcardPosition::Multiple);
        assert_eq!(pattern.match_mapping(&message::Message::default()), Some(vec![]));
        assert_eq!(pattern.match_mapping(&make_message!(1i64)), Some(vec![]));
        assert_eq!(
            pattern.match_mapping(&make_message!(1i64, true, 0.5f64)),
            Some(vec![])
        );
    }

    #[test]
    fn backtracking_finds_a_split_and_rolls_back_dead_ends() {
        // First wildcard must absorb one i64 so the fixed i64 can land on
        // the second; a greedy left-to-right walk commits and retracts.
        let pattern = Pattern::compile(vec![
            PatternAtom::Any,
            ty::<i64>(),
            PatternAtom::Any,
            ty::<bool>(),
        ]);
        let msg = make_message!(1i64, 2i64, "mid".to_string(), true);
        assert_eq!(pattern.match_mapping(&msg), Some(vec![0, 3]));

        let no_bool = make_message!(1i64, 2i64);
        assert!(pattern.match_mapping(&no_bool).is_none());
    }

    #[test]
    fn shape_check_agrees_with_mapping() {
        let patterns = [
            Pattern::compile(vec![ty::<i64>()]),
            Pattern::compile(vec![PatternAtom::Any, ty::<i64>()]),
            Pattern::compile(vec![ty::<i64>(), PatternAtom::Any]),
            Pattern::compile(vec![ty::<i64>(), PatternAtom::Any, ty::<bool>()]),
            Pattern::compile(vec![PatternAtom::Any, ty::<bool>(), PatternAtom::Any]),
        ];
        let messages = [
            message::Message::default(),
            make_message!(1i64),
            make_message!(true),
            make_message!(1i64, true),
            make_message!(true, 1i64),
            make_message!(1i64, "s".to_string(), true),
        ];
        for pattern in &patterns {
            for msg in &messages {
                assert_eq!(
                    pattern.matches_shape(msg),
                    pattern.match_mapping(msg).is_some(),
                    "{:?} vs {msg}",
                    pattern.atoms()
                );
            }
        }
    }

    #[test]
    fn dynamic_messages_match_concrete_patterns_exactly() {
        let pattern = Pattern::compile(vec![ty::<i64>(), ty::<String>()]);
        let mut builder = message::MessageBuilder::new();
        builder.append(9i64).append("dyn".to_string());
        let dynamic = builder.move_to_message().unwrap();
        assert!(dynamic.is_dynamically_typed());
        assert_eq!(pattern.match_mapping(&dynamic), Some(vec![0, 1]));
    }
}
