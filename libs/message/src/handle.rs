//! The copy-on-write message handle.
//!
//! ## Purpose
//!
//! `Message` is the value type the rest of the system passes around: a
//! fixed-length, immutable-by-default tuple with elements of any registered
//! type. Copying a `Message` copies a pointer and bumps an atomic reference
//! count; element storage is shared until a handle needs to mutate, at which
//! point [`Message::data_mut`], the single mutation choke point, swaps in
//! a private copy first. Handles may therefore be copied and dropped freely
//! across threads, while payload mutation is race-free by construction
//! rather than by locking.
//!
//! Slicing (`drop_left`, `take`, `select`) and splicing produce zero-copy
//! views; [`Message::concat`] is the eager counterpart that merges operands
//! into one fresh contiguous block.

use crate::concat::Concat;
use crate::data::{MessageData, PlainData};
use crate::decorated::Decorated;
use crate::error::{MessageError, MessageResult};
use std::any;
use std::fmt;
use std::sync::Arc;
use types::registry;
use types::{Deserializer, Element, Serializer, TypeId, TypeIdList, TypeMeta, TypeToken};

/// A fixed-length copy-on-write tuple with elements of any registered type.
#[derive(Clone, Default)]
pub struct Message {
    data: Option<Arc<MessageData>>,
}

impl Message {
    /// Wraps freshly built storage in a handle.
    pub(crate) fn from_data(data: MessageData) -> Message {
        Message {
            data: Some(Arc::new(data)),
        }
    }

    /// Builds a statically-shaped message from a tuple of element values.
    ///
    /// Every element type must be registered. This is the eager, non-view
    /// construction path used by [`make_message!`](crate::make_message).
    pub fn from_values<T: IntoMessage>(values: T) -> MessageResult<Message> {
        values.into_message()
    }

    /// Borrow of the backing storage, if any.
    pub fn data(&self) -> Option<&MessageData> {
        self.data.as_deref()
    }

    /// Mutable borrow of the backing storage, unsharing it first if any
    /// other handle still references it. All mutation funnels through here.
    pub(crate) fn data_mut(&mut self) -> Option<&mut MessageData> {
        let arc = self.data.as_mut()?;
        if Arc::strong_count(arc) > 1 {
            *arc = Arc::new(arc.copy_for_unshare());
        }
        Some(Arc::get_mut(arc).expect("storage still shared after unshare"))
    }

    pub fn len(&self) -> usize {
        self.data.as_deref().map_or(0, MessageData::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The interned type sequence of this message.
    pub fn types(&self) -> TypeIdList {
        self.data
            .as_deref()
            .map_or_else(TypeIdList::empty, |d| d.types().clone())
    }

    /// The fast-comparison token of this message's type sequence.
    pub fn token(&self) -> TypeToken {
        self.data
            .as_deref()
            .map_or_else(|| TypeIdList::empty().token(), MessageData::token)
    }

    /// True if this message's shape was not statically known at
    /// construction (produced by a builder or a deserializer). Matching
    /// treats such messages conservatively (exact comparison, no caching).
    pub fn is_dynamically_typed(&self) -> bool {
        self.data.as_deref().is_some_and(MessageData::is_dynamic)
    }

    /// The type id of the element at `pos`.
    pub fn type_at(&self, pos: usize) -> Option<TypeId> {
        self.data.as_deref().and_then(|d| d.types().get(pos))
    }

    /// True if this message's type sequence is exactly `ids`.
    pub fn has_types(&self, ids: &[TypeId]) -> bool {
        self.data.as_deref().map_or(ids.is_empty(), |d| d.types().ids() == ids)
    }

    /// Checked typed access to the element at `pos`.
    ///
    /// Returns `None` for an out-of-bounds position or a type mismatch;
    /// memory is never reinterpreted on a wrong guess.
    pub fn get_as<T: Element>(&self, pos: usize) -> Option<&T> {
        let data = self.data.as_deref()?;
        if pos >= data.len() {
            return None;
        }
        let meta = data.meta_at(pos);
        if meta.rust_type != any::TypeId::of::<T>() {
            return None;
        }
        // SAFETY: the registry guarantees the slot holds a live T.
        unsafe { Some(&*data.at(pos).cast::<T>()) }
    }

    /// Checked mutable typed access, unsharing storage first.
    ///
    /// The position and type are validated before any unsharing happens, so
    /// a failed access never pays for a copy.
    pub fn get_mut_as<T: Element>(&mut self, pos: usize) -> Option<&mut T> {
        {
            let data = self.data.as_deref()?;
            if pos >= data.len() || data.meta_at(pos).rust_type != any::TypeId::of::<T>() {
                return None;
            }
        }
        let data = self.data_mut()?;
        // SAFETY: validated above; data_mut guarantees exclusivity.
        unsafe { Some(&mut *data.mutable_at(pos).cast::<T>()) }
    }

    /// True if any other handle references the same storage.
    pub fn is_shared(&self) -> bool {
        self.data.as_ref().is_some_and(|arc| Arc::strong_count(arc) > 1)
    }

    /// True if both handles reference the identical storage object.
    pub fn shares_storage(&self, other: &Message) -> bool {
        match (&self.data, &other.data) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Unshares the backing storage now, regardless of later mutation.
    pub fn force_unshare(&mut self) {
        let _ = self.data_mut();
    }

    /// A new message with all but the first `n` elements.
    pub fn drop_left(&self, n: usize) -> Message {
        if n == 0 {
            return self.clone();
        }
        if n >= self.len() {
            return Message::default();
        }
        self.decorate((n..self.len()).collect())
    }

    /// A new message with all but the last `n` elements.
    pub fn drop_right(&self, n: usize) -> Message {
        if n == 0 {
            return self.clone();
        }
        if n >= self.len() {
            return Message::default();
        }
        self.decorate((0..self.len() - n).collect())
    }

    /// A new message with only the first `n` elements.
    pub fn take(&self, n: usize) -> Message {
        if n >= self.len() {
            self.clone()
        } else {
            self.drop_right(self.len() - n)
        }
    }

    /// A new message with only the last `n` elements.
    pub fn take_right(&self, n: usize) -> Message {
        if n >= self.len() {
            self.clone()
        } else {
            self.drop_left(self.len() - n)
        }
    }

    /// A new message exposing the elements named by `indices`, in order.
    /// Returns `None` if any index is out of bounds.
    pub fn select(&self, indices: &[usize]) -> Option<Message> {
        if indices.iter().any(|&i| i >= self.len()) {
            return None;
        }
        if indices.is_empty() {
            return Some(Message::default());
        }
        Some(self.decorate(indices.to_vec()))
    }

    fn decorate(&self, mapping: Vec<usize>) -> Message {
        Message::from_data(MessageData::Decorated(Decorated::new(self.clone(), mapping)))
    }

    /// Lazy zero-copy concatenation: element storage stays with the
    /// operands. Prefer [`Message::concat`] unless the result is
    /// short-lived.
    pub fn splice(parts: &[Message]) -> Message {
        let concat = Concat::new(parts.to_vec());
        if concat.len() == 0 {
            return Message::default();
        }
        Message::from_data(MessageData::Concat(concat))
    }

    /// Eager concatenation into one new physically contiguous storage
    /// block. Elements are copy-constructed from the operands in order.
    pub fn concat(parts: &[Message]) -> MessageResult<Message> {
        let type_lists: Vec<TypeIdList> = parts.iter().map(|p| p.types()).collect();
        let refs: Vec<&TypeIdList> = type_lists.iter().collect();
        let combined = TypeIdList::concat(&refs);
        if combined.is_empty() {
            return Ok(Message::default());
        }
        let dynamic = parts.iter().any(Message::is_dynamically_typed);
        let mut plain = PlainData::create(combined, dynamic)?;
        for part in parts {
            if let Some(data) = part.data() {
                for pos in 0..data.len() {
                    let meta = data.meta_at(pos);
                    let src = data.at(pos);
                    // SAFETY: destination slot is uninitialized and shaped
                    // for this element's type.
                    unsafe { plain.construct_next(|dst| (meta.copy_construct)(dst, src)) };
                }
            }
        }
        Ok(Message::from_data(MessageData::Plain(plain)))
    }

    /// Element-wise equality: same length, same types, equal values, in
    /// order; short-circuits on the first mismatch.
    pub fn equals(&self, other: &Message) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let (a, b) = match (self.data(), other.data()) {
            (Some(a), Some(b)) => (a, b),
            _ => return true, // both empty
        };
        if a.types() != b.types() {
            return false;
        }
        for pos in 0..a.len() {
            let meta = a.meta_at(pos);
            // SAFETY: both elements are live and of the same type.
            if !unsafe { (meta.eq)(a.at(pos), b.at(pos)) } {
                return false;
            }
        }
        true
    }

    /// Element-wise comparison against expected values.
    ///
    /// Matches when the lengths agree and every concrete matcher position
    /// holds the same type and an equal value; [`ValueMatcher::any`]
    /// positions match any element. Short-circuits on the first mismatch.
    ///
    /// ```
    /// use message::{make_message, ValueMatcher};
    ///
    /// let msg = make_message!(1i64, "hi".to_string());
    /// assert!(msg.matches(&[ValueMatcher::of(1i64).unwrap(), ValueMatcher::any()]));
    /// assert!(!msg.matches(&[ValueMatcher::of(2i64).unwrap(), ValueMatcher::any()]));
    /// ```
    pub fn matches(&self, expected: &[ValueMatcher]) -> bool {
        if self.len() != expected.len() {
            return false;
        }
        let data = match self.data() {
            Some(data) => data,
            None => return true, // both empty
        };
        for (pos, matcher) in expected.iter().enumerate() {
            let holder = match &matcher.slot {
                Some(holder) => holder,
                None => continue,
            };
            let meta = holder.meta();
            if data.meta_at(pos).rust_type != meta.rust_type {
                return false;
            }
            // SAFETY: both values are live and of the same type.
            if !unsafe { (meta.eq)(data.at(pos), holder.as_ptr()) } {
                return false;
            }
        }
        true
    }

    /// Saves this message through a structural sink.
    pub fn save(&self, sink: &mut dyn Serializer) -> MessageResult<()> {
        let types = self.types();
        sink.begin_tuple(&types)?;
        if let Some(data) = self.data() {
            for pos in 0..data.len() {
                sink.begin_element(data.types().ids()[pos])?;
                data.save_element(pos, sink)?;
                sink.end_element()?;
            }
        }
        sink.end_tuple()?;
        Ok(())
    }

    /// Loads a message from a structural source.
    ///
    /// `expected` supplies the shape for untyped (human-readable) sources
    /// and cross-checks typed ones. On any failure the partially constructed
    /// storage is torn down (only the elements constructed so far are
    /// destroyed) and nothing remains reachable.
    pub fn load(
        source: &mut dyn Deserializer,
        expected: Option<&TypeIdList>,
    ) -> MessageResult<Message> {
        let types = source.begin_tuple(expected)?;
        if types.is_empty() {
            source.end_tuple()?;
            return Ok(Message::default());
        }
        let mut plain = PlainData::create(types.clone(), true)?;
        for _ in 0..types.len() {
            source.begin_element()?;
            plain.load_next(source)?;
            source.end_element()?;
        }
        source.end_tuple()?;
        Ok(Message::from_data(MessageData::Plain(plain)))
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        if let Some(data) = self.data() {
            for pos in 0..data.len() {
                if pos > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", data.stringify(pos))?;
            }
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message{self}")
    }
}

trait MatchValue: Send + Sync {
    fn meta(&self) -> &'static TypeMeta;

    /// Pointer to the held value, for the registry's type-erased `eq`.
    fn as_ptr(&self) -> *const u8;
}

struct Holder<T: Element> {
    value: T,
    meta: &'static TypeMeta,
}

impl<T: Element> MatchValue for Holder<T> {
    fn meta(&self) -> &'static TypeMeta {
        self.meta
    }

    fn as_ptr(&self) -> *const u8 {
        (&self.value as *const T).cast()
    }
}

/// One position of a value pattern for [`Message::matches`]: either a
/// concrete expected value or a placeholder matching any element.
pub struct ValueMatcher {
    slot: Option<Box<dyn MatchValue>>,
}

impl ValueMatcher {
    /// Expects exactly `value` (type and value) at this position.
    ///
    /// Fails if `T` was never registered.
    pub fn of<T: Element>(value: T) -> MessageResult<ValueMatcher> {
        let meta = registry::meta_of::<T>().ok_or(MessageError::UnregisteredType {
            type_name: any::type_name::<T>(),
        })?;
        Ok(ValueMatcher {
            slot: Some(Box::new(Holder { value, meta })),
        })
    }

    /// Matches any element at this position.
    pub fn any() -> ValueMatcher {
        ValueMatcher { slot: None }
    }
}

impl fmt::Debug for ValueMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.slot {
            // SAFETY: the held value is live and of the meta's type.
            Some(holder) => write!(f, "{}", unsafe { (holder.meta().stringify)(holder.as_ptr()) }),
            None => write!(f, "_"),
        }
    }
}

/// Conversion of a tuple of element values into a statically-shaped
/// message. Implemented for tuples of registered element types up to arity
/// eight.
pub trait IntoMessage {
    fn into_message(self) -> MessageResult<Message>;
}

impl IntoMessage for () {
    fn into_message(self) -> MessageResult<Message> {
        Ok(Message::default())
    }
}

macro_rules! impl_into_message {
    ($($name:ident : $ty:ident),+) => {
        impl<$($ty: Element),+> IntoMessage for ($($ty,)+) {
            fn into_message(self) -> MessageResult<Message> {
                let metas = [$(
                    registry::meta_of::<$ty>().ok_or(MessageError::UnregisteredType {
                        type_name: any::type_name::<$ty>(),
                    })?,
                )+];
                let ids: Vec<TypeId> = metas.iter().map(|m| m.type_id).collect();
                let mut plain = PlainData::create(TypeIdList::intern(&ids), false)?;
                let ($($name,)+) = self;
                // SAFETY: slots are constructed in order, each fully
                // initialized by a move of the matching value.
                unsafe {
                    $(plain.construct_next(|dst| dst.cast::<$ty>().write($name));)+
                }
                Ok(Message::from_data(MessageData::Plain(plain)))
            }
        }
    };
}

impl_into_message!(a: A);
impl_into_message!(a: A, b: B);
impl_into_message!(a: A, b: B, c: C);
impl_into_message!(a: A, b: B, c: C, d: D);
impl_into_message!(a: A, b: B, c: C, d: D, e: E);
impl_into_message!(a: A, b: B, c: C, d: D, e: E, f: F);
impl_into_message!(a: A, b: B, c: C, d: D, e: E, f: F, g: G);
impl_into_message!(a: A, b: B, c: C, d: D, e: E, f: F, g: G, h: H);
