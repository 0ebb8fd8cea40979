//! The block factory: the only way to obtain budgeted builders and blocks.

use std::sync::Arc;

use tracing::trace;

use crate::data::{
    estimate_block_bytes, estimate_vector_bytes, Block, BlockBuilder, BooleanBlockBuilder,
    BooleanVectorBuilder, BytesRefBlockBuilder, BytesRefValues, BytesRefVectorBuilder,
    ConstantNullBlock, DoubleBlockBuilder, DoubleVectorBuilder, IntBlockBuilder,
    IntVectorBuilder, LongBlockBuilder, LongVectorBuilder, Primitive, PrimitiveValues,
    TypedVector, ValueStore, VectorBuilder, BLOCK_OVERHEAD_BYTES,
};
use crate::error::Result;
use crate::memory::budget::{MemoryBudget, MemoryReservation};
use crate::types::Value;

/// Hands out builders and blocks whose memory counts against one budget.
///
/// Cheap to clone; clones share the budget.
#[derive(Debug, Clone)]
pub struct BlockFactory {
    budget: Arc<MemoryBudget>,
}

impl BlockFactory {
    /// Creates a factory charging `budget`.
    #[must_use]
    pub fn new(budget: Arc<MemoryBudget>) -> Self {
        Self { budget }
    }

    /// Returns the budget.
    #[must_use]
    pub fn budget(&self) -> &Arc<MemoryBudget> {
        &self.budget
    }

    /// Reserves raw bytes against the budget.
    ///
    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the bytes do not fit.
    pub fn reserve(&self, bytes: usize, label: &str) -> Result<MemoryReservation> {
        self.budget.reserve(bytes, label)
    }

    /// Creates a block builder for `estimated` positions of any element type.
    ///
    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the estimate does not fit.
    pub fn new_block_builder<A: ValueStore>(&self, estimated: usize) -> Result<BlockBuilder<A>> {
        let bytes = estimate_block_bytes::<A>(estimated);
        trace!(element_type = %A::ELEMENT_TYPE, estimated, bytes, "new block builder");
        let reservation = self.budget.reserve(bytes, "block builder")?;
        Ok(BlockBuilder::new(estimated, reservation))
    }

    /// Creates a vector builder for `estimated` positions of any element type.
    ///
    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the estimate does not fit.
    pub fn new_vector_builder<A: ValueStore>(&self, estimated: usize) -> Result<VectorBuilder<A>> {
        let bytes = estimate_vector_bytes::<A>(estimated);
        trace!(element_type = %A::ELEMENT_TYPE, estimated, bytes, "new vector builder");
        let reservation = self.budget.reserve(bytes, "vector builder")?;
        Ok(VectorBuilder::new(estimated, reservation))
    }

    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the estimate does not fit.
    pub fn new_boolean_block_builder(&self, estimated: usize) -> Result<BooleanBlockBuilder> {
        self.new_block_builder(estimated)
    }

    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the estimate does not fit.
    pub fn new_int_block_builder(&self, estimated: usize) -> Result<IntBlockBuilder> {
        self.new_block_builder(estimated)
    }

    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the estimate does not fit.
    pub fn new_long_block_builder(&self, estimated: usize) -> Result<LongBlockBuilder> {
        self.new_block_builder(estimated)
    }

    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the estimate does not fit.
    pub fn new_double_block_builder(&self, estimated: usize) -> Result<DoubleBlockBuilder> {
        self.new_block_builder(estimated)
    }

    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the estimate does not fit.
    pub fn new_bytes_ref_block_builder(&self, estimated: usize) -> Result<BytesRefBlockBuilder> {
        self.new_block_builder(estimated)
    }

    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the estimate does not fit.
    pub fn new_boolean_vector_builder(&self, estimated: usize) -> Result<BooleanVectorBuilder> {
        self.new_vector_builder(estimated)
    }

    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the estimate does not fit.
    pub fn new_int_vector_builder(&self, estimated: usize) -> Result<IntVectorBuilder> {
        self.new_vector_builder(estimated)
    }

    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the estimate does not fit.
    pub fn new_long_vector_builder(&self, estimated: usize) -> Result<LongVectorBuilder> {
        self.new_vector_builder(estimated)
    }

    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the estimate does not fit.
    pub fn new_double_vector_builder(&self, estimated: usize) -> Result<DoubleVectorBuilder> {
        self.new_vector_builder(estimated)
    }

    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the estimate does not fit.
    pub fn new_bytes_ref_vector_builder(&self, estimated: usize) -> Result<BytesRefVectorBuilder> {
        self.new_vector_builder(estimated)
    }

    /// Creates a block of `position_count` nulls.
    ///
    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the block overhead does not fit.
    pub fn new_constant_null_block(&self, position_count: usize) -> Result<Block> {
        let reservation = self.budget.reserve(BLOCK_OVERHEAD_BYTES, "constant null block")?;
        Ok(ConstantNullBlock::new(position_count, reservation).into())
    }

    /// Creates a vector owning `values`.
    ///
    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the values do not fit.
    pub fn new_array_vector<T: Primitive>(
        &self,
        values: Vec<T>,
    ) -> Result<TypedVector<PrimitiveValues<T>>> {
        let mut builder = self.new_vector_builder::<PrimitiveValues<T>>(values.len())?;
        for value in values {
            builder.append_value(value);
        }
        builder.build()
    }

    /// Creates a vector of byte sequences.
    ///
    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the values do not fit.
    pub fn new_bytes_ref_array_vector<B: AsRef<[u8]>>(
        &self,
        values: &[B],
    ) -> Result<TypedVector<BytesRefValues>> {
        let mut builder = self.new_bytes_ref_vector_builder(values.len())?;
        for value in values {
            builder.append_value(value.as_ref());
        }
        builder.build()
    }

    /// Creates a block repeating `value` at every position.
    ///
    /// A null value yields a [`ConstantNullBlock`].
    ///
    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the block does not fit.
    pub fn new_constant_block(&self, value: &Value, position_count: usize) -> Result<Block> {
        match value {
            Value::Null => self.new_constant_null_block(position_count),
            Value::Boolean(v) => self.repeat::<PrimitiveValues<bool>>(*v, position_count),
            Value::Int(v) => self.repeat::<PrimitiveValues<i32>>(*v, position_count),
            Value::Long(v) => self.repeat::<PrimitiveValues<i64>>(*v, position_count),
            Value::Double(v) => self.repeat::<PrimitiveValues<f64>>(*v, position_count),
            Value::BytesRef(v) => self.repeat::<BytesRefValues>(v.as_slice(), position_count),
        }
    }

    fn repeat<A: ValueStore>(&self, value: A::Value<'_>, position_count: usize) -> Result<Block> {
        let mut builder = self.new_vector_builder::<A>(position_count)?;
        for _ in 0..position_count {
            builder.append_value(value);
        }
        Ok(builder.build()?.into_block().into())
    }
}
