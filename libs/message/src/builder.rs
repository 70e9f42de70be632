//! Incremental, type-erased message construction.
//!
//! The builder accumulates elements one at a time when a message's shape is
//! only known at runtime. Each pending element can be finalized either by
//! copying (`to_message`, builder stays reusable) or by moving
//! (`move_to_message`, builder is consumed; reuse after moving is a
//! compile error, not a runtime hazard). Builder-produced messages are
//! dynamically typed: the dispatch layer matches them exactly and never
//! caches their shape.

use crate::data::{MessageData, PlainData};
use crate::error::{MessageError, MessageResult};
use crate::handle::Message;
use std::any;
use types::registry::{self, TypeMeta};
use types::{Element, TypeId, TypeIdList};

trait PendingSlot: Send + Sync {
    fn meta(&self) -> &'static TypeMeta;

    /// Clones the pending value into uninitialized storage.
    ///
    /// # Safety
    ///
    /// `dst` must point to uninitialized storage sized and aligned for this
    /// slot's type.
    unsafe fn copy_into(&self, dst: *mut u8);

    /// Moves the pending value into uninitialized storage, leaving the slot
    /// empty.
    ///
    /// # Safety
    ///
    /// As for `copy_into`; additionally each slot may be moved out of only
    /// once.
    unsafe fn move_into(&mut self, dst: *mut u8);
}

struct Pending<T: Element> {
    value: Option<T>,
    meta: &'static TypeMeta,
}

impl<T: Element> PendingSlot for Pending<T> {
    fn meta(&self) -> &'static TypeMeta {
        self.meta
    }

    unsafe fn copy_into(&self, dst: *mut u8) {
        let value = self.value.as_ref().expect("pending slot already moved");
        dst.cast::<T>().write(value.clone());
    }

    unsafe fn move_into(&mut self, dst: *mut u8) {
        let value = self.value.take().expect("pending slot already moved");
        dst.cast::<T>().write(value);
    }
}

/// Accumulates type-erased elements and finalizes them into a message.
#[derive(Default)]
pub struct MessageBuilder {
    slots: Vec<Box<dyn PendingSlot>>,
}

impl MessageBuilder {
    pub fn new() -> MessageBuilder {
        MessageBuilder { slots: Vec::new() }
    }

    pub fn with_capacity(n: usize) -> MessageBuilder {
        MessageBuilder {
            slots: Vec::with_capacity(n),
        }
    }

    /// Appends one element, recording its type id and padded size.
    ///
    /// Fails if `T` was never registered.
    pub fn try_append<T: Element>(&mut self, value: T) -> MessageResult<&mut Self> {
        let meta = registry::meta_of::<T>().ok_or(MessageError::UnregisteredType {
            type_name: any::type_name::<T>(),
        })?;
        self.slots.push(Box::new(Pending {
            value: Some(value),
            meta,
        }));
        Ok(self)
    }

    /// Like [`try_append`](Self::try_append), but panics if `T` was never
    /// registered; appending an unregistered type is a programming error.
    pub fn append<T: Element>(&mut self, value: T) -> &mut Self {
        match self.try_append(value) {
            Ok(this) => this,
            Err(err) => panic!("{err}"),
        }
    }

    /// Discards all pending elements without finalizing.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Total padded payload size accumulated so far, in bytes.
    pub fn payload_size(&self) -> usize {
        self.slots.iter().map(|s| s.meta().padded_size).sum()
    }

    fn types(&self) -> TypeIdList {
        let ids: Vec<TypeId> = self.slots.iter().map(|s| s.meta().type_id).collect();
        TypeIdList::intern(&ids)
    }

    /// Finalizes by copying every pending element; the builder stays valid
    /// and can finalize again.
    pub fn to_message(&self) -> MessageResult<Message> {
        if self.slots.is_empty() {
            return Ok(Message::default());
        }
        let mut plain = PlainData::create(self.types(), true)?;
        for slot in &self.slots {
            // SAFETY: slots are constructed in order; copy_into fully
            // initializes the matching slot.
            unsafe { plain.construct_next(|dst| slot.copy_into(dst)) };
        }
        Ok(Message::from_data(MessageData::Plain(plain)))
    }

    /// Finalizes by moving every pending element, consuming the builder.
    pub fn move_to_message(mut self) -> MessageResult<Message> {
        if self.slots.is_empty() {
            return Ok(Message::default());
        }
        let mut plain = PlainData::create(self.types(), true)?;
        for slot in &mut self.slots {
            // SAFETY: as in to_message; each slot is moved exactly once.
            unsafe { plain.construct_next(|dst| slot.move_into(dst)) };
        }
        Ok(Message::from_data(MessageData::Plain(plain)))
    }
}

impl std::fmt::Debug for MessageBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBuilder")
            .field("pending", &self.slots.len())
            .field("payload_size", &self.payload_size())
            .finish()
    }
}
