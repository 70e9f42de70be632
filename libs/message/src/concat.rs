//! Splice view over several messages.
//!
//! The lazy counterpart to [`crate::Message::concat`]: element storage stays
//! with the operands, this view only translates logical positions. Nested
//! splice inputs are flattened at construction, and position lookup is a
//! linear scan over the operand sizes; operand counts are expected to be
//! small (typically two).

use crate::data::MessageData;
use crate::handle::Message;
use types::registry::TypeMeta;
use types::{SerialResult, Serializer, TypeIdList};

/// A zero-copy concatenation of several messages.
#[derive(Debug, Clone)]
pub struct Concat {
    parts: Box<[Message]>,
    types: TypeIdList,
    total: usize,
}

impl Concat {
    /// Builds a splice of `parts`, flattening nested splices and dropping
    /// empty operands.
    pub(crate) fn new(parts: Vec<Message>) -> Concat {
        let mut flat: Vec<Message> = Vec::with_capacity(parts.len());
        for part in parts {
            match part.data() {
                None => {}
                Some(MessageData::Concat(inner)) => flat.extend(inner.parts.iter().cloned()),
                Some(_) => flat.push(part),
            }
        }
        let type_lists: Vec<TypeIdList> = flat.iter().map(|p| p.types()).collect();
        let refs: Vec<&TypeIdList> = type_lists.iter().collect();
        let types = TypeIdList::concat(&refs);
        let total = flat.iter().map(|p| p.len()).sum();
        Concat {
            parts: flat.into_boxed_slice(),
            types,
            total,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.total
    }

    pub(crate) fn types(&self) -> &TypeIdList {
        &self.types
    }

    pub(crate) fn is_dynamic(&self) -> bool {
        self.parts.iter().any(|p| p.is_dynamically_typed())
    }

    /// Resolves a logical position to (operand index, local position).
    fn select(&self, pos: usize) -> (usize, usize) {
        debug_assert!(pos < self.total);
        let mut rest = pos;
        for (idx, part) in self.parts.iter().enumerate() {
            if rest < part.len() {
                return (idx, rest);
            }
            rest -= part.len();
        }
        unreachable!("position {pos} out of bounds for spliced message of {}", self.total)
    }

    fn part_data(&self, idx: usize) -> &MessageData {
        // Empty operands are dropped in `new`, so every part has data.
        self.parts[idx].data().expect("spliced view without source")
    }

    pub(crate) fn meta_at(&self, pos: usize) -> &'static TypeMeta {
        let (idx, local) = self.select(pos);
        self.part_data(idx).meta_at(local)
    }

    pub(crate) fn at(&self, pos: usize) -> *const u8 {
        let (idx, local) = self.select(pos);
        self.part_data(idx).at(local)
    }

    /// Unshares only the operand holding `pos`; sibling operands stay
    /// shared.
    pub(crate) fn mutable_at(&mut self, pos: usize) -> *mut u8 {
        let (idx, local) = self.select(pos);
        self.parts[idx]
            .data_mut()
            .expect("spliced view without source")
            .mutable_at(local)
    }

    pub(crate) fn stringify(&self, pos: usize) -> String {
        let (idx, local) = self.select(pos);
        self.part_data(idx).stringify(local)
    }

    pub(crate) fn save_element(&self, pos: usize, sink: &mut dyn Serializer) -> SerialResult<()> {
        let (idx, local) = self.select(pos);
        self.part_data(idx).save_element(local, sink)
    }

    #[cfg(test)]
    pub(crate) fn part_count(&self) -> usize {
        self.parts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_message;

    fn as_concat(msg: &Message) -> &Concat {
        match msg.data() {
            Some(MessageData::Concat(view)) => view,
            other => panic!("expected a spliced view, got {other:?}"),
        }
    }

    #[test]
    fn splice_flattens_nested_splices() {
        let a = make_message!(1i64);
        let b = make_message!(2i64);
        let c = make_message!(3i64);
        let inner = Message::splice(&[a.clone(), b]);
        let outer = Message::splice(&[inner, c]);
        assert_eq!(as_concat(&outer).part_count(), 3);
        assert_eq!(outer, make_message!(1i64, 2i64, 3i64));
    }

    #[test]
    fn splice_drops_empty_operands() {
        let a = make_message!(1u16, 2u16);
        let spliced = Message::splice(&[Message::default(), a.clone(), Message::default()]);
        assert_eq!(as_concat(&spliced).part_count(), 1);
        assert_eq!(spliced, a);
    }

    #[test]
    fn splice_of_nothing_is_empty() {
        let spliced = Message::splice(&[Message::default(), Message::default()]);
        assert!(spliced.is_empty());
        assert!(spliced.data().is_none());
    }

    #[test]
    fn positions_resolve_across_operand_boundaries() {
        let left = make_message!(1i32, "two".to_string());
        let right = make_message!(3.0f64);
        let spliced = Message::splice(&[left, right]);
        assert_eq!(spliced.len(), 3);
        assert_eq!(spliced.get_as::<i32>(0), Some(&1));
        assert_eq!(spliced.get_as::<String>(1).map(String::as_str), Some("two"));
        assert_eq!(spliced.get_as::<f64>(2), Some(&3.0));
        assert_eq!(
            spliced.types(),
            make_message!(0i32, String::new(), 0.0f64).types()
        );
    }

    #[test]
    fn mutation_unshares_only_the_owning_operand() {
        let left = make_message!(10i64);
        let right = make_message!(20i64);
        let mut spliced = Message::splice(&[left.clone(), right.clone()]);
        *spliced.get_mut_as::<i64>(1).unwrap() = 99;
        assert_eq!(spliced.get_as::<i64>(1), Some(&99));
        assert_eq!(right.get_as::<i64>(0), Some(&20));
        // The untouched operand is still shared with `left`.
        assert!(left.is_shared());
        assert!(!right.is_shared());
    }
}
