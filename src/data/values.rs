//! Typed value storage behind blocks and vectors.
//!
//! A [`ValueStore`] is the flat array of values a block indexes into. Each
//! element type has exactly one store, so evaluators generic over a store are
//! monomorphized into one loop per type with no dispatch per value.

use std::fmt;
use std::mem::size_of;

use crate::data::block::{Block, TypedBlock};
use crate::types::{ElementType, Value};

/// Flat, immutable storage of one element type.
pub trait ValueStore: Sized + Send + Sync + 'static {
    /// The element type this store holds.
    const ELEMENT_TYPE: ElementType;

    /// Borrowed view of one value.
    type Value<'a>: Copy + PartialEq + fmt::Debug
    where
        Self: 'a;

    /// Growable counterpart used while building.
    type Builder: ValueStoreBuilder<Store = Self>;

    /// Number of stored values.
    fn len(&self) -> usize;

    /// Returns true if nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the value at `index`.
    fn get(&self, index: usize) -> Self::Value<'_>;

    /// Heap bytes held by this store.
    fn ram_bytes(&self) -> usize;

    /// Bytes a store of `values` values is expected to need.
    fn estimate_bytes(values: usize) -> usize;

    /// Wraps a typed block into the general [`Block`].
    fn wrap(block: TypedBlock<Self>) -> Block;

    /// Returns the typed block if `block` holds this element type.
    fn downcast(block: &Block) -> Option<&TypedBlock<Self>>;

    /// Copies a value out into a [`Value`].
    fn to_value(value: Self::Value<'_>) -> Value;
}

/// Append-only builder for a [`ValueStore`].
pub trait ValueStoreBuilder: Send + Sized {
    type Store: ValueStore;

    /// Creates a builder sized for `values` values.
    fn with_capacity(values: usize) -> Self;

    /// Appends one value.
    fn push(&mut self, value: <Self::Store as ValueStore>::Value<'_>);

    /// Number of values appended so far.
    fn len(&self) -> usize;

    /// Returns true if nothing was appended.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Heap bytes the finished store will hold.
    fn ram_bytes(&self) -> usize;

    /// Freezes the builder.
    fn finish(self) -> Self::Store;
}

// =============================================================================
// Fixed-width values
// =============================================================================

/// Fixed-width element types stored in a plain slice.
pub trait Primitive: Copy + PartialEq + Default + fmt::Debug + Send + Sync + 'static {
    const ELEMENT_TYPE: ElementType;

    fn wrap(block: TypedBlock<PrimitiveValues<Self>>) -> Block;

    fn downcast(block: &Block) -> Option<&TypedBlock<PrimitiveValues<Self>>>;

    fn to_value(self) -> Value;
}

macro_rules! impl_primitive {
    ($ty:ty, $variant:ident) => {
        impl Primitive for $ty {
            const ELEMENT_TYPE: ElementType = ElementType::$variant;

            fn wrap(block: TypedBlock<PrimitiveValues<Self>>) -> Block {
                Block::$variant(block)
            }

            fn downcast(block: &Block) -> Option<&TypedBlock<PrimitiveValues<Self>>> {
                match block {
                    Block::$variant(b) => Some(b),
                    _ => None,
                }
            }

            fn to_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

impl_primitive!(bool, Boolean);
impl_primitive!(i32, Int);
impl_primitive!(i64, Long);
impl_primitive!(f64, Double);

/// Values of a fixed-width type.
#[derive(Debug, Clone)]
pub struct PrimitiveValues<T>(Box<[T]>);

impl<T: Primitive> PrimitiveValues<T> {
    /// Returns the values as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.0
    }
}

impl<T: Primitive> ValueStore for PrimitiveValues<T> {
    const ELEMENT_TYPE: ElementType = T::ELEMENT_TYPE;

    type Value<'a> = T;
    type Builder = PrimitiveValuesBuilder<T>;

    fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        self.0[index]
    }

    fn ram_bytes(&self) -> usize {
        self.0.len() * size_of::<T>()
    }

    fn estimate_bytes(values: usize) -> usize {
        values * size_of::<T>()
    }

    fn wrap(block: TypedBlock<Self>) -> Block {
        T::wrap(block)
    }

    fn downcast(block: &Block) -> Option<&TypedBlock<Self>> {
        T::downcast(block)
    }

    fn to_value(value: T) -> Value {
        value.to_value()
    }
}

/// Builder for [`PrimitiveValues`].
#[derive(Debug)]
pub struct PrimitiveValuesBuilder<T>(Vec<T>);

impl<T: Primitive> ValueStoreBuilder for PrimitiveValuesBuilder<T> {
    type Store = PrimitiveValues<T>;

    fn with_capacity(values: usize) -> Self {
        Self(Vec::with_capacity(values))
    }

    #[inline]
    fn push(&mut self, value: T) {
        self.0.push(value);
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn ram_bytes(&self) -> usize {
        self.0.len() * size_of::<T>()
    }

    fn finish(self) -> PrimitiveValues<T> {
        PrimitiveValues(self.0.into_boxed_slice())
    }
}

// =============================================================================
// Variable-length values
// =============================================================================

/// Byte sequences stored back to back with an offsets array.
#[derive(Debug, Clone)]
pub struct BytesRefValues {
    /// `len + 1` offsets into `bytes`.
    offsets: Box<[usize]>,
    bytes: Box<[u8]>,
}

/// Expected average length of one byte sequence when sizing builders.
const ESTIMATED_BYTES_PER_VALUE: usize = 16;

impl ValueStore for BytesRefValues {
    const ELEMENT_TYPE: ElementType = ElementType::BytesRef;

    type Value<'a> = &'a [u8];
    type Builder = BytesRefValuesBuilder;

    fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    #[inline]
    fn get(&self, index: usize) -> &[u8] {
        &self.bytes[self.offsets[index]..self.offsets[index + 1]]
    }

    fn ram_bytes(&self) -> usize {
        self.offsets.len() * size_of::<usize>() + self.bytes.len()
    }

    fn estimate_bytes(values: usize) -> usize {
        (values + 1) * size_of::<usize>() + values * ESTIMATED_BYTES_PER_VALUE
    }

    fn wrap(block: TypedBlock<Self>) -> Block {
        Block::BytesRef(block)
    }

    fn downcast(block: &Block) -> Option<&TypedBlock<Self>> {
        match block {
            Block::BytesRef(b) => Some(b),
            _ => None,
        }
    }

    fn to_value(value: &[u8]) -> Value {
        Value::BytesRef(value.to_vec())
    }
}

/// Builder for [`BytesRefValues`].
#[derive(Debug)]
pub struct BytesRefValuesBuilder {
    offsets: Vec<usize>,
    bytes: Vec<u8>,
}

impl ValueStoreBuilder for BytesRefValuesBuilder {
    type Store = BytesRefValues;

    fn with_capacity(values: usize) -> Self {
        let mut offsets = Vec::with_capacity(values + 1);
        offsets.push(0);
        Self {
            offsets,
            bytes: Vec::with_capacity(values * ESTIMATED_BYTES_PER_VALUE),
        }
    }

    #[inline]
    fn push(&mut self, value: &[u8]) {
        self.bytes.extend_from_slice(value);
        self.offsets.push(self.bytes.len());
    }

    fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    fn ram_bytes(&self) -> usize {
        self.offsets.len() * size_of::<usize>() + self.bytes.len()
    }

    fn finish(self) -> BytesRefValues {
        BytesRefValues {
            offsets: self.offsets.into_boxed_slice(),
            bytes: self.bytes.into_boxed_slice(),
        }
    }
}
