//! Global type metadata registry.
//!
//! ## Purpose
//!
//! Maps every `TypeId` to a `TypeMeta`: a table of type-erased operation
//! function pointers (construct, destroy, copy, move, compare, stringify,
//! save, load) plus layout information, monomorphized from a concrete
//! `Element` implementation at registration time. Message storage performs
//! all element manipulation through these tables and never names a concrete
//! Rust type.
//!
//! Registration happens incrementally at startup (builtins on first touch,
//! custom types explicitly via [`register`]) and entries are never removed,
//! so a `&'static TypeMeta` obtained once stays valid for the process
//! lifetime. The table is guarded by a `RwLock`; lookups take the read side.

use crate::element::Element;
use crate::error::{TypeError, TypeResult};
use crate::serial::{Deserializer, SerialResult, Serializer};
use crate::type_id::{BuiltinType, TypeId, FIRST_CUSTOM_TYPE_ID};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any;
use std::collections::HashMap;
use std::mem;
use tracing::debug;

/// Per-type metadata record: layout plus type-erased operations.
///
/// All function pointers operate on raw element storage. Callers must pass
/// pointers to storage of exactly this type; the `rust_type` field exists so
/// typed accessors can verify that before reinterpreting memory.
pub struct TypeMeta {
    /// Registry id of this type.
    pub type_id: TypeId,
    /// Display name, used in stringified type sequences and errors.
    pub type_name: &'static str,
    /// Identity of the concrete Rust type, for checked downcasts.
    pub rust_type: any::TypeId,
    /// Size of one element in bytes.
    pub size: usize,
    /// Alignment of one element.
    pub align: usize,
    /// Size rounded up to a multiple of the alignment; used for packed
    /// storage accounting.
    pub padded_size: usize,
    /// Writes a default-constructed value into uninitialized storage.
    pub default_construct: unsafe fn(*mut u8),
    /// Drops the value in place.
    pub destroy: unsafe fn(*mut u8),
    /// Clones `src` into uninitialized `dst`.
    pub copy_construct: unsafe fn(dst: *mut u8, src: *const u8),
    /// Moves the value out of `src` into uninitialized `dst`; `src` is dead
    /// afterwards.
    pub move_construct: unsafe fn(dst: *mut u8, src: *mut u8),
    /// Element-wise equality of two values of this type.
    pub eq: unsafe fn(*const u8, *const u8) -> bool,
    /// Debug rendering of the value.
    pub stringify: unsafe fn(*const u8) -> String,
    /// Writes the value through a structural sink.
    pub save: unsafe fn(*const u8, &mut dyn Serializer) -> SerialResult<()>,
    /// Replaces the (initialized) value with one read from a source.
    pub load: unsafe fn(*mut u8, &mut dyn Deserializer) -> SerialResult<()>,
}

impl std::fmt::Debug for TypeMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeMeta")
            .field("type_id", &self.type_id)
            .field("type_name", &self.type_name)
            .field("size", &self.size)
            .field("align", &self.align)
            .finish()
    }
}

unsafe fn default_construct_impl<T: Element + Default>(ptr: *mut u8) {
    ptr.cast::<T>().write(T::default());
}

unsafe fn destroy_impl<T: Element>(ptr: *mut u8) {
    ptr.cast::<T>().drop_in_place();
}

unsafe fn copy_construct_impl<T: Element>(dst: *mut u8, src: *const u8) {
    dst.cast::<T>().write((*src.cast::<T>()).clone());
}

unsafe fn move_construct_impl<T: Element>(dst: *mut u8, src: *mut u8) {
    dst.cast::<T>().write(src.cast::<T>().read());
}

unsafe fn eq_impl<T: Element>(lhs: *const u8, rhs: *const u8) -> bool {
    *lhs.cast::<T>() == *rhs.cast::<T>()
}

unsafe fn stringify_impl<T: Element>(ptr: *const u8) -> String {
    format!("{:?}", &*ptr.cast::<T>())
}

unsafe fn save_impl<T: Element>(ptr: *const u8, sink: &mut dyn Serializer) -> SerialResult<()> {
    (*ptr.cast::<T>()).save(sink)
}

unsafe fn load_impl<T: Element>(ptr: *mut u8, source: &mut dyn Deserializer) -> SerialResult<()> {
    (*ptr.cast::<T>()).load(source)
}

fn make_meta<T: Element + Default>(type_id: TypeId, type_name: &'static str) -> &'static TypeMeta {
    let size = mem::size_of::<T>();
    let align = mem::align_of::<T>().max(1);
    Box::leak(Box::new(TypeMeta {
        type_id,
        type_name,
        rust_type: any::TypeId::of::<T>(),
        size,
        align,
        padded_size: size.div_ceil(align) * align,
        default_construct: default_construct_impl::<T>,
        destroy: destroy_impl::<T>,
        copy_construct: copy_construct_impl::<T>,
        move_construct: move_construct_impl::<T>,
        eq: eq_impl::<T>,
        stringify: stringify_impl::<T>,
        save: save_impl::<T>,
        load: load_impl::<T>,
    }))
}

struct RegistryInner {
    by_id: HashMap<TypeId, &'static TypeMeta>,
    by_rust: HashMap<any::TypeId, &'static TypeMeta>,
    next_custom: u16,
}

impl RegistryInner {
    fn insert(&mut self, meta: &'static TypeMeta) {
        self.by_id.insert(meta.type_id, meta);
        self.by_rust.insert(meta.rust_type, meta);
    }
}

static REGISTRY: Lazy<RwLock<RegistryInner>> = Lazy::new(|| {
    let mut inner = RegistryInner {
        by_id: HashMap::new(),
        by_rust: HashMap::new(),
        next_custom: FIRST_CUSTOM_TYPE_ID,
    };
    macro_rules! builtin {
        ($ty:ty, $variant:ident) => {
            inner.insert(make_meta::<$ty>(
                TypeId::from(BuiltinType::$variant),
                BuiltinType::$variant.name(),
            ));
        };
    }
    builtin!((), Unit);
    builtin!(bool, Bool);
    builtin!(i8, I8);
    builtin!(i16, I16);
    builtin!(i32, I32);
    builtin!(i64, I64);
    builtin!(u8, U8);
    builtin!(u16, U16);
    builtin!(u32, U32);
    builtin!(u64, U64);
    builtin!(f32, F32);
    builtin!(f64, F64);
    builtin!(String, Str);
    RwLock::new(inner)
});

/// Registers `T` as a message element type and returns its id.
///
/// Idempotent: re-registering an already-known Rust type returns the
/// existing id, ignoring `name`. Entries are never removed.
pub fn register<T: Element + Default>(name: &'static str) -> TypeResult<TypeId> {
    let mut inner = REGISTRY.write();
    if let Some(meta) = inner.by_rust.get(&any::TypeId::of::<T>()) {
        return Ok(meta.type_id);
    }
    if inner.next_custom == u16::MAX {
        return Err(TypeError::IdSpaceExhausted {
            registered: inner.by_id.len(),
        });
    }
    let id = TypeId::from_raw(inner.next_custom);
    inner.next_custom += 1;
    let meta = make_meta::<T>(id, name);
    inner.insert(meta);
    debug!(type_name = name, type_id = id.raw(), "registered element type");
    Ok(id)
}

/// Looks up the metadata record for a type id.
pub fn lookup(id: TypeId) -> Option<&'static TypeMeta> {
    REGISTRY.read().by_id.get(&id).copied()
}

/// Looks up the metadata record for a concrete Rust type.
pub fn meta_of<T: 'static>() -> Option<&'static TypeMeta> {
    REGISTRY.read().by_rust.get(&any::TypeId::of::<T>()).copied()
}

/// Returns the type id of a registered Rust type.
pub fn type_id_of<T: 'static>() -> Option<TypeId> {
    meta_of::<T>().map(|m| m.type_id)
}

/// Like [`type_id_of`] but panics for unregistered types.
///
/// Intended for pattern construction, where an unregistered type in a case
/// signature is a programming error, not a runtime condition.
pub fn expect_type_id<T: 'static>() -> TypeId {
    match type_id_of::<T>() {
        Some(id) => id,
        None => panic!(
            "type `{}` is not registered as a message element; call registry::register first",
            any::type_name::<T>()
        ),
    }
}

/// Display name of a type id, falling back to the raw number.
pub fn name_of(id: TypeId) -> String {
    match lookup(id) {
        Some(meta) => meta.type_name.to_string(),
        None => format!("{id}"),
    }
}
