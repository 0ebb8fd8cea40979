//! Vectors: dense, non-null, single-valued blocks.

use std::fmt;
use std::sync::Arc;

use crate::data::block::{BlockData, TypedBlock};
use crate::data::values::{BytesRefValues, Primitive, PrimitiveValues, ValueStore};

/// Exactly one value per position, never null.
///
/// A vector shares its buffers with the block it was obtained from; turning it
/// back into a block with [`TypedVector::into_block`] transfers that reference.
pub struct TypedVector<A: ValueStore> {
    data: Arc<BlockData<A>>,
}

impl<A: ValueStore> Clone for TypedVector<A> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<A: ValueStore> TypedVector<A> {
    pub(crate) fn from_shared(data: Arc<BlockData<A>>) -> Self {
        debug_assert!(data.first_value_indexes.is_none() && data.nulls.is_none());
        Self { data }
    }

    /// Number of positions.
    #[must_use]
    pub fn position_count(&self) -> usize {
        self.data.position_count
    }

    /// Reads the value at `position`.
    #[inline]
    #[must_use]
    pub fn get(&self, position: usize) -> A::Value<'_> {
        self.data.values.get(position)
    }

    /// Iterates every value in position order.
    pub fn iter(&self) -> impl Iterator<Item = A::Value<'_>> + '_ {
        (0..self.position_count()).map(move |p| self.get(p))
    }

    /// Bytes charged to the budget for the shared buffers.
    #[must_use]
    pub fn ram_bytes_used(&self) -> usize {
        self.data.reservation.bytes()
    }

    /// Number of live references to the shared buffers.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.data)
    }

    /// Wraps this vector into a block view.
    #[must_use]
    pub fn into_block(self) -> TypedBlock<A> {
        TypedBlock::from_shared(self.data)
    }
}

impl<T: Primitive> TypedVector<PrimitiveValues<T>> {
    /// Returns the values as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        self.data.values.as_slice()
    }
}

impl<A: ValueStore> fmt::Debug for TypedVector<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Vector of booleans.
pub type BooleanVector = TypedVector<PrimitiveValues<bool>>;
/// Vector of 32-bit integers.
pub type IntVector = TypedVector<PrimitiveValues<i32>>;
/// Vector of 64-bit integers.
pub type LongVector = TypedVector<PrimitiveValues<i64>>;
/// Vector of doubles.
pub type DoubleVector = TypedVector<PrimitiveValues<f64>>;
/// Vector of byte sequences.
pub type BytesRefVector = TypedVector<BytesRefValues>;
