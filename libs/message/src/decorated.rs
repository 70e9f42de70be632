//! Index-remapping view over another message.
//!
//! Backs `drop_left`, `drop_right`, `take`, `take_right`, and general
//! projection. Construction over an existing decorated view composes the
//! two mappings against that view's own source, so lookup stays one
//! indirection deep no matter how many times a message has been sliced.

use crate::data::MessageData;
use crate::handle::Message;
use types::registry::TypeMeta;
use types::{SerialResult, Serializer, TypeIdList};

/// A zero-copy slice/projection of an underlying message.
#[derive(Debug, Clone)]
pub struct Decorated {
    source: Message,
    mapping: Box<[usize]>,
    types: TypeIdList,
}

impl Decorated {
    /// Builds a view of `source` exposing the elements named by `mapping`,
    /// in mapping order.
    ///
    /// Precondition: every mapping index is below `source.len()`.
    pub(crate) fn new(source: Message, mapping: Vec<usize>) -> Decorated {
        debug_assert!(mapping.iter().all(|&i| i < source.len()));
        // Compose instead of nesting when the source is itself a view.
        let (source, mapping) = match source.data() {
            Some(MessageData::Decorated(inner)) => {
                let remapped: Vec<usize> = mapping.iter().map(|&i| inner.mapping[i]).collect();
                (inner.source.clone(), remapped)
            }
            _ => (source, mapping),
        };
        let types = source
            .data()
            .map(|d| d.types().project(&mapping))
            .unwrap_or_else(TypeIdList::empty);
        Decorated {
            source,
            mapping: mapping.into_boxed_slice(),
            types,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.mapping.len()
    }

    pub(crate) fn types(&self) -> &TypeIdList {
        &self.types
    }

    pub(crate) fn is_dynamic(&self) -> bool {
        self.source.is_dynamically_typed()
    }

    fn source_data(&self) -> &MessageData {
        // A decorated view is never built over an empty message.
        self.source.data().expect("decorated view without source")
    }

    pub(crate) fn meta_at(&self, pos: usize) -> &'static TypeMeta {
        self.source_data().meta_at(self.mapping[pos])
    }

    pub(crate) fn at(&self, pos: usize) -> *const u8 {
        self.source_data().at(self.mapping[pos])
    }

    /// Unshares only the backing storage, then resolves the mapped slot.
    pub(crate) fn mutable_at(&mut self, pos: usize) -> *mut u8 {
        let mapped = self.mapping[pos];
        self.source
            .data_mut()
            .expect("decorated view without source")
            .mutable_at(mapped)
    }

    pub(crate) fn stringify(&self, pos: usize) -> String {
        self.source_data().stringify(self.mapping[pos])
    }

    pub(crate) fn save_element(&self, pos: usize, sink: &mut dyn Serializer) -> SerialResult<()> {
        self.source_data().save_element(self.mapping[pos], sink)
    }

    #[cfg(test)]
    pub(crate) fn source_is_plain(&self) -> bool {
        matches!(self.source.data(), Some(MessageData::Plain(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_message;

    fn as_decorated(msg: &Message) -> &Decorated {
        match msg.data() {
            Some(MessageData::Decorated(view)) => view,
            other => panic!("expected a decorated view, got {other:?}"),
        }
    }

    #[test]
    fn repeated_slicing_composes_mappings() {
        let base = make_message!(1i64, 2i64, 3i64, 4i64);
        let twice = base.drop_left(1).drop_left(1);
        let once = base.drop_left(2);
        assert_eq!(twice, once);
        // The second slice re-targets the plain storage, not the first view.
        assert!(as_decorated(&twice).source_is_plain());
        assert_eq!(as_decorated(&twice).mapping.as_ref(), &[2, 3]);
    }

    #[test]
    fn projection_reorders_and_repeats() {
        let base = make_message!(10u8, 20u8, 30u8);
        let view = base.select(&[2, 0, 0]).unwrap();
        assert_eq!(view.len(), 3);
        assert_eq!(view.get_as::<u8>(0), Some(&30));
        assert_eq!(view.get_as::<u8>(1), Some(&10));
        assert_eq!(view.get_as::<u8>(2), Some(&10));
    }

    #[test]
    fn view_shares_source_storage_until_mutation() {
        let base = make_message!(5i32, 6i32);
        let mut view = base.take(1);
        // The view holds a handle onto the same plain storage.
        assert!(base.is_shared());
        *view.get_mut_as::<i32>(0).unwrap() = 50;
        assert_eq!(view.get_as::<i32>(0), Some(&50));
        assert_eq!(base.get_as::<i32>(0), Some(&5));
    }

    #[test]
    fn view_types_are_projected_and_interned() {
        let base = make_message!(1i64, "x".to_string(), true);
        let view = base.select(&[0, 2]).unwrap();
        let direct = make_message!(9i64, false);
        assert!(view.types().ptr_eq(&direct.types()));
        assert_eq!(view.token(), direct.token());
    }
}
