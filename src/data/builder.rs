//! Builders for blocks and vectors.
//!
//! Builders are obtained from a [`BlockFactory`](crate::memory::BlockFactory),
//! which reserves the estimated size up front. `build` consumes the builder
//! and settles the reservation to the exact size of the finished buffers.
//! A builder dropped without building returns its reservation.

use crate::data::block::{BlockData, TypedBlock, BLOCK_OVERHEAD_BYTES};
use crate::data::nulls::NullMask;
use crate::data::values::{BytesRefValues, PrimitiveValues, ValueStore, ValueStoreBuilder};
use crate::data::vector::TypedVector;
use crate::error::Result;
use crate::memory::MemoryReservation;

use std::mem::size_of;
use std::sync::Arc;

/// Bytes to reserve for a block builder expecting `positions` positions.
pub(crate) fn estimate_block_bytes<A: ValueStore>(positions: usize) -> usize {
    BLOCK_OVERHEAD_BYTES + A::estimate_bytes(positions) + (positions + 1) * size_of::<usize>()
}

/// Bytes to reserve for a vector builder expecting `positions` positions.
pub(crate) fn estimate_vector_bytes<A: ValueStore>(positions: usize) -> usize {
    BLOCK_OVERHEAD_BYTES + A::estimate_bytes(positions)
}

/// Positional builder for a block, supporting nulls and multi-valued positions.
///
/// Not thread-safe; used by exactly one producer.
pub struct BlockBuilder<A: ValueStore> {
    values: A::Builder,
    first_value_indexes: Vec<usize>,
    nulls: NullMask,
    has_nulls: bool,
    multivalued: bool,
    entry_start: Option<usize>,
    reservation: MemoryReservation,
}

impl<A: ValueStore> BlockBuilder<A> {
    pub(crate) fn new(positions: usize, reservation: MemoryReservation) -> Self {
        Self {
            values: A::Builder::with_capacity(positions),
            first_value_indexes: Vec::with_capacity(positions + 1),
            nulls: NullMask::with_capacity(positions),
            has_nulls: false,
            multivalued: false,
            entry_start: None,
            reservation,
        }
    }

    /// Number of positions appended so far.
    #[must_use]
    pub fn position_count(&self) -> usize {
        self.first_value_indexes.len()
    }

    /// Appends a null position. Closes an open position entry first.
    pub fn append_null(&mut self) -> &mut Self {
        if self.entry_start.is_some() {
            self.end_position_entry();
        }
        self.first_value_indexes.push(self.values.len());
        self.nulls.push(true);
        self.has_nulls = true;
        self
    }

    /// Appends a value.
    ///
    /// Inside a position entry the value joins the current position; otherwise
    /// it forms a single-valued position of its own.
    #[inline]
    pub fn append_value(&mut self, value: A::Value<'_>) -> &mut Self {
        if self.entry_start.is_none() {
            self.first_value_indexes.push(self.values.len());
            self.nulls.push(false);
        }
        self.values.push(value);
        self
    }

    /// Opens a position that collects every value appended until
    /// [`end_position_entry`](Self::end_position_entry).
    pub fn begin_position_entry(&mut self) -> &mut Self {
        if self.entry_start.is_some() {
            self.end_position_entry();
        }
        self.entry_start = Some(self.values.len());
        self
    }

    /// Closes the open position. An entry with no values becomes null.
    pub fn end_position_entry(&mut self) -> &mut Self {
        let Some(start) = self.entry_start.take() else {
            return self;
        };
        let count = self.values.len() - start;
        self.first_value_indexes.push(start);
        self.nulls.push(count == 0);
        self.has_nulls |= count == 0;
        self.multivalued |= count > 1;
        self
    }

    /// Appends a copy of `position` from `block`, preserving nulls and
    /// multi-valued positions.
    pub fn copy_position(&mut self, block: &TypedBlock<A>, position: usize) -> &mut Self {
        if block.is_null(position) {
            return self.append_null();
        }
        let count = block.value_count(position);
        if count == 1 {
            return self.append_value(block.get(block.first_value_index(position)));
        }
        self.begin_position_entry();
        for value in block.values_at(position) {
            self.append_value(value);
        }
        self.end_position_entry()
    }

    /// Finalizes the block.
    ///
    /// A block that ended up non-null and single-valued everywhere is stored
    /// densely and answers [`TypedBlock::as_vector`].
    ///
    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the finished buffers outgrow the reservation
    /// and the budget cannot cover the difference.
    pub fn build(mut self) -> Result<TypedBlock<A>> {
        self.end_position_entry();
        let position_count = self.first_value_indexes.len();
        let dense = !self.has_nulls && !self.multivalued;

        let (first_value_indexes, nulls) = if dense {
            (None, None)
        } else {
            self.first_value_indexes.push(self.values.len());
            let nulls = self.has_nulls.then_some(self.nulls);
            (Some(self.first_value_indexes.into_boxed_slice()), nulls)
        };

        let bytes = BLOCK_OVERHEAD_BYTES
            + self.values.ram_bytes()
            + first_value_indexes
                .as_ref()
                .map_or(0, |indexes| indexes.len() * size_of::<usize>())
            + nulls.as_ref().map_or(0, NullMask::ram_bytes);
        self.reservation.resize(bytes, "block")?;

        Ok(TypedBlock::from_data(BlockData {
            position_count,
            values: self.values.finish(),
            first_value_indexes,
            nulls,
            multivalued: self.multivalued,
            reservation: self.reservation,
        }))
    }
}

/// Builder for a vector: values only, one per position.
pub struct VectorBuilder<A: ValueStore> {
    values: A::Builder,
    reservation: MemoryReservation,
}

impl<A: ValueStore> VectorBuilder<A> {
    pub(crate) fn new(positions: usize, reservation: MemoryReservation) -> Self {
        Self {
            values: A::Builder::with_capacity(positions),
            reservation,
        }
    }

    /// Number of positions appended so far.
    #[must_use]
    pub fn position_count(&self) -> usize {
        self.values.len()
    }

    /// Appends the value for the next position.
    #[inline]
    pub fn append_value(&mut self, value: A::Value<'_>) -> &mut Self {
        self.values.push(value);
        self
    }

    /// Finalizes the vector.
    ///
    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the finished buffer outgrows the reservation
    /// and the budget cannot cover the difference.
    pub fn build(mut self) -> Result<TypedVector<A>> {
        let bytes = BLOCK_OVERHEAD_BYTES + self.values.ram_bytes();
        self.reservation.resize(bytes, "vector")?;
        Ok(TypedVector::from_shared(Arc::new(BlockData {
            position_count: self.values.len(),
            values: self.values.finish(),
            first_value_indexes: None,
            nulls: None,
            multivalued: false,
            reservation: self.reservation,
        })))
    }
}

/// Builder for boolean blocks.
pub type BooleanBlockBuilder = BlockBuilder<PrimitiveValues<bool>>;
/// Builder for int blocks.
pub type IntBlockBuilder = BlockBuilder<PrimitiveValues<i32>>;
/// Builder for long blocks.
pub type LongBlockBuilder = BlockBuilder<PrimitiveValues<i64>>;
/// Builder for double blocks.
pub type DoubleBlockBuilder = BlockBuilder<PrimitiveValues<f64>>;
/// Builder for byte-sequence blocks.
pub type BytesRefBlockBuilder = BlockBuilder<BytesRefValues>;

/// Builder for boolean vectors.
pub type BooleanVectorBuilder = VectorBuilder<PrimitiveValues<bool>>;
/// Builder for int vectors.
pub type IntVectorBuilder = VectorBuilder<PrimitiveValues<i32>>;
/// Builder for long vectors.
pub type LongVectorBuilder = VectorBuilder<PrimitiveValues<i64>>;
/// Builder for double vectors.
pub type DoubleVectorBuilder = VectorBuilder<PrimitiveValues<f64>>;
/// Builder for byte-sequence vectors.
pub type BytesRefVectorBuilder = VectorBuilder<BytesRefValues>;
