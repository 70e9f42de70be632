//! Packed message storage.
//!
//! ## Purpose
//!
//! `PlainData` is the single-allocation physical representation of a tuple:
//! an ordered type-id list plus one contiguous byte buffer holding every
//! element at an alignment-padded offset. All element manipulation goes
//! through the registry's type-erased function pointers, so this module
//! never names a concrete element type.
//!
//! `MessageData` is the closed set of storage representations, physical
//! (`Plain`) or virtual (`Decorated` index remapping, `Concat` splice), so
//! the matching and dispatch layers never distinguish how a tuple is backed.
//!
//! ## Partial construction
//!
//! Elements are constructed one at a time (copy, move, or
//! default-then-load). `PlainData` tracks how many elements are live and its
//! `Drop` destroys exactly that many, which makes a failed deserialization
//! tear down cleanly without touching uninitialized storage.

use crate::concat::Concat;
use crate::decorated::Decorated;
use crate::error::{MessageError, MessageResult};
use std::alloc::{self, Layout};
use std::ptr::NonNull;
use tracing::trace;
use types::registry::{self, TypeMeta};
use types::{Deserializer, SerialResult, Serializer, TypeIdList, TypeToken};

/// One contiguous, fully-owned storage block.
pub struct PlainData {
    types: TypeIdList,
    metas: Box<[&'static TypeMeta]>,
    offsets: Box<[usize]>,
    layout: Layout,
    buf: NonNull<u8>,
    constructed: usize,
    dynamic: bool,
}

// Elements are constrained to Send + Sync by the `Element` trait bound at
// registration, and the raw buffer is owned exclusively by this struct.
unsafe impl Send for PlainData {}
unsafe impl Sync for PlainData {}

impl PlainData {
    /// Allocates an uninitialized block shaped for `types`.
    ///
    /// No elements are constructed. Fails with [`MessageError::UnknownType`]
    /// if any id is unregistered and [`MessageError::Alloc`] if the block
    /// cannot be allocated; neither failure leaves partial storage behind.
    pub(crate) fn create(types: TypeIdList, dynamic: bool) -> MessageResult<PlainData> {
        let mut metas = Vec::with_capacity(types.len());
        let mut offsets = Vec::with_capacity(types.len());
        let mut cursor = 0usize;
        let mut align = 1usize;
        for &id in types.ids() {
            let meta = registry::lookup(id).ok_or(MessageError::UnknownType {
                type_id: id.raw(),
                context: "storage creation",
            })?;
            cursor = round_up(cursor, meta.align);
            offsets.push(cursor);
            cursor += meta.size;
            align = align.max(meta.align);
            metas.push(meta);
        }
        let layout = Layout::from_size_align(cursor, align).map_err(|_| MessageError::Alloc {
            bytes: cursor,
            elements: types.len(),
        })?;
        let buf = if layout.size() == 0 {
            NonNull::dangling()
        } else {
            // SAFETY: layout has non-zero size.
            let raw = unsafe { alloc::alloc(layout) };
            NonNull::new(raw).ok_or(MessageError::Alloc {
                bytes: layout.size(),
                elements: types.len(),
            })?
        };
        trace!(elements = types.len(), bytes = layout.size(), "allocated message storage");
        Ok(PlainData {
            types,
            metas: metas.into_boxed_slice(),
            offsets: offsets.into_boxed_slice(),
            layout,
            buf,
            constructed: 0,
            dynamic,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.types.len()
    }

    pub(crate) fn types(&self) -> &TypeIdList {
        &self.types
    }

    pub(crate) fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub(crate) fn meta_at(&self, pos: usize) -> &'static TypeMeta {
        self.metas[pos]
    }

    /// Pointer to the element at `pos`. The element must be constructed.
    pub(crate) fn at(&self, pos: usize) -> *const u8 {
        debug_assert!(pos < self.constructed);
        // SAFETY: offsets[pos] is inside the allocation by construction.
        unsafe { self.buf.as_ptr().add(self.offsets[pos]) }
    }

    pub(crate) fn mutable_at(&mut self, pos: usize) -> *mut u8 {
        debug_assert!(pos < self.constructed);
        // SAFETY: as above; &mut self guarantees exclusivity.
        unsafe { self.buf.as_ptr().add(self.offsets[pos]) }
    }

    /// Constructs the next element in sequence through `f`.
    ///
    /// # Safety
    ///
    /// `f` must fully initialize a value of the element's type at the given
    /// pointer.
    pub(crate) unsafe fn construct_next<F: FnOnce(*mut u8)>(&mut self, f: F) {
        debug_assert!(self.constructed < self.len());
        let ptr = self.buf.as_ptr().add(self.offsets[self.constructed]);
        f(ptr);
        self.constructed += 1;
    }

    /// Default-constructs the next element, then loads its value from
    /// `source`. The element counts as constructed even if the load fails,
    /// so teardown stays correct.
    pub(crate) fn load_next(&mut self, source: &mut dyn Deserializer) -> SerialResult<()> {
        debug_assert!(self.constructed < self.len());
        let meta = self.metas[self.constructed];
        // SAFETY: slot is uninitialized and sized for this type.
        unsafe {
            let ptr = self.buf.as_ptr().add(self.offsets[self.constructed]);
            (meta.default_construct)(ptr);
            self.constructed += 1;
            (meta.load)(ptr, source)
        }
    }

    /// Deep-copies all elements into a freshly allocated block of identical
    /// shape. Diverges via `handle_alloc_error` if the block cannot be
    /// allocated, matching the std container convention for the
    /// unshare-on-mutate path.
    pub(crate) fn deep_copy(&self) -> PlainData {
        debug_assert_eq!(self.constructed, self.len());
        let mut copy = match PlainData::create(self.types.clone(), self.dynamic) {
            Ok(copy) => copy,
            Err(_) => alloc::handle_alloc_error(self.layout),
        };
        for pos in 0..self.len() {
            let meta = self.metas[pos];
            let src = self.at(pos);
            // SAFETY: destination slot is uninitialized, source is live.
            unsafe { copy.construct_next(|dst| (meta.copy_construct)(dst, src)) };
        }
        copy
    }

    pub(crate) fn stringify(&self, pos: usize) -> String {
        // SAFETY: element is live.
        unsafe { (self.metas[pos].stringify)(self.at(pos)) }
    }

    pub(crate) fn save_element(&self, pos: usize, sink: &mut dyn Serializer) -> SerialResult<()> {
        // SAFETY: element is live.
        unsafe { (self.metas[pos].save)(self.at(pos), sink) }
    }
}

impl Drop for PlainData {
    fn drop(&mut self) {
        for pos in 0..self.constructed {
            // SAFETY: exactly the first `constructed` elements are live.
            unsafe {
                (self.metas[pos].destroy)(self.buf.as_ptr().add(self.offsets[pos]));
            }
        }
        if self.layout.size() > 0 {
            // SAFETY: allocated in `create` with this exact layout.
            unsafe { alloc::dealloc(self.buf.as_ptr(), self.layout) };
        }
    }
}

impl std::fmt::Debug for PlainData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlainData")
            .field("types", &self.types)
            .field("constructed", &self.constructed)
            .field("dynamic", &self.dynamic)
            .finish()
    }
}

fn round_up(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

/// A tuple's backing representation: physical or virtual.
#[derive(Debug)]
pub enum MessageData {
    Plain(PlainData),
    Decorated(Decorated),
    Concat(Concat),
}

impl MessageData {
    pub fn len(&self) -> usize {
        match self {
            MessageData::Plain(d) => d.len(),
            MessageData::Decorated(d) => d.len(),
            MessageData::Concat(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn types(&self) -> &TypeIdList {
        match self {
            MessageData::Plain(d) => d.types(),
            MessageData::Decorated(d) => d.types(),
            MessageData::Concat(d) => d.types(),
        }
    }

    pub fn token(&self) -> TypeToken {
        self.types().token()
    }

    pub fn is_dynamic(&self) -> bool {
        match self {
            MessageData::Plain(d) => d.is_dynamic(),
            MessageData::Decorated(d) => d.is_dynamic(),
            MessageData::Concat(d) => d.is_dynamic(),
        }
    }

    pub(crate) fn meta_at(&self, pos: usize) -> &'static TypeMeta {
        match self {
            MessageData::Plain(d) => d.meta_at(pos),
            MessageData::Decorated(d) => d.meta_at(pos),
            MessageData::Concat(d) => d.meta_at(pos),
        }
    }

    pub(crate) fn at(&self, pos: usize) -> *const u8 {
        match self {
            MessageData::Plain(d) => d.at(pos),
            MessageData::Decorated(d) => d.at(pos),
            MessageData::Concat(d) => d.at(pos),
        }
    }

    /// Mutable pointer to the element at `pos`.
    ///
    /// For views this unshares only the backing storage that actually holds
    /// the element; sibling backings (and views sharing them) are untouched.
    pub(crate) fn mutable_at(&mut self, pos: usize) -> *mut u8 {
        match self {
            MessageData::Plain(d) => d.mutable_at(pos),
            MessageData::Decorated(d) => d.mutable_at(pos),
            MessageData::Concat(d) => d.mutable_at(pos),
        }
    }

    /// Produces the storage a COW handle swaps in when it must unshare.
    ///
    /// Physical storage is deep-copied. Views are cloned structurally: their
    /// inner handles are themselves copy-on-write, so mutation through the
    /// clone unshares the targeted backing storage on its own.
    pub(crate) fn copy_for_unshare(&self) -> MessageData {
        match self {
            MessageData::Plain(d) => MessageData::Plain(d.deep_copy()),
            MessageData::Decorated(d) => MessageData::Decorated(d.clone()),
            MessageData::Concat(d) => MessageData::Concat(d.clone()),
        }
    }

    pub fn stringify(&self, pos: usize) -> String {
        match self {
            MessageData::Plain(d) => d.stringify(pos),
            MessageData::Decorated(d) => d.stringify(pos),
            MessageData::Concat(d) => d.stringify(pos),
        }
    }

    pub(crate) fn save_element(&self, pos: usize, sink: &mut dyn Serializer) -> SerialResult<()> {
        match self {
            MessageData::Plain(d) => d.save_element(pos, sink),
            MessageData::Decorated(d) => d.save_element(pos, sink),
            MessageData::Concat(d) => d.save_element(pos, sink),
        }
    }
}
