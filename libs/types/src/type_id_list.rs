//! Interned, immutable type-id sequences.
//!
//! Every message shape is described by a `TypeIdList`. Lists are interned in
//! a process-wide cache: structurally equal lists share one backing buffer,
//! so pointer identity doubles as an O(1) exact shape comparison. A
//! published list's buffer is never mutated and never freed.

use crate::registry;
use crate::token::TypeToken;
use crate::type_id::TypeId;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
struct ListInner {
    ids: Box<[TypeId]>,
    token: TypeToken,
}

/// An immutable, interned ordered sequence of type ids.
///
/// Cloning is an `Arc` bump. Equality first tries pointer identity (which
/// interning makes authoritative for lists produced by [`TypeIdList::intern`])
/// and falls back to a structural compare.
#[derive(Clone)]
pub struct TypeIdList {
    inner: Arc<ListInner>,
}

struct Interned(Arc<ListInner>);

impl PartialEq for Interned {
    fn eq(&self, other: &Self) -> bool {
        self.0.ids == other.0.ids
    }
}

impl Eq for Interned {}

impl Hash for Interned {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.ids.hash(state);
    }
}

impl Borrow<[TypeId]> for Interned {
    fn borrow(&self) -> &[TypeId] {
        &self.0.ids
    }
}

static INTERNER: Lazy<Mutex<HashSet<Interned>>> = Lazy::new(|| Mutex::new(HashSet::new()));

impl TypeIdList {
    /// Returns the canonical interned list for this id sequence.
    pub fn intern(ids: &[TypeId]) -> TypeIdList {
        let mut cache = INTERNER.lock();
        if let Some(existing) = cache.get(ids) {
            return TypeIdList {
                inner: Arc::clone(&existing.0),
            };
        }
        let inner = Arc::new(ListInner {
            ids: ids.into(),
            token: TypeToken::of(ids),
        });
        debug!(len = ids.len(), "interned new type sequence");
        cache.insert(Interned(Arc::clone(&inner)));
        TypeIdList { inner }
    }

    /// The canonical empty list.
    pub fn empty() -> TypeIdList {
        static EMPTY: Lazy<TypeIdList> = Lazy::new(|| TypeIdList::intern(&[]));
        EMPTY.clone()
    }

    /// Interns the concatenation of the given lists, in order.
    pub fn concat(lists: &[&TypeIdList]) -> TypeIdList {
        let mut ids = Vec::with_capacity(lists.iter().map(|l| l.len()).sum());
        for list in lists {
            ids.extend_from_slice(list.ids());
        }
        TypeIdList::intern(&ids)
    }

    /// Interns the projection of this list through `indices`.
    ///
    /// Precondition: every index is in bounds.
    pub fn project(&self, indices: &[usize]) -> TypeIdList {
        let ids: Vec<TypeId> = indices.iter().map(|&i| self.inner.ids[i]).collect();
        TypeIdList::intern(&ids)
    }

    /// The underlying id slice.
    pub fn ids(&self) -> &[TypeId] {
        &self.inner.ids
    }

    pub fn len(&self) -> usize {
        self.inner.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.ids.is_empty()
    }

    /// The id at `pos`, if in bounds.
    pub fn get(&self, pos: usize) -> Option<TypeId> {
        self.inner.ids.get(pos).copied()
    }

    /// The precomputed token of this sequence.
    pub fn token(&self) -> TypeToken {
        self.inner.token
    }

    /// True if both lists share the same interned backing buffer.
    pub fn ptr_eq(&self, other: &TypeIdList) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for TypeIdList {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.inner.ids == other.inner.ids
    }
}

impl Eq for TypeIdList {}

impl fmt::Debug for TypeIdList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeIdList{self}")
    }
}

impl fmt::Display for TypeIdList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, &id) in self.inner.ids.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", registry::name_of(id))?;
        }
        write!(f, ")")
    }
}
