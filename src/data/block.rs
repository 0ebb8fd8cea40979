//! Blocks: the general columnar container.
//!
//! A block has one entry per position. Each position is null or maps to a
//! run of one or more values in the underlying [`ValueStore`] through a
//! first-value-index indirection. Blocks are immutable and reference counted:
//! cloning a block shares it, and its memory reservation is returned to the
//! budget when the last clone is dropped.

use std::fmt;
use std::sync::Arc;

use crate::data::builder::BlockBuilder;
use crate::data::nulls::NullMask;
use crate::data::values::{BytesRefValues, PrimitiveValues, ValueStore};
use crate::data::vector::TypedVector;
use crate::error::{ColexecError, Result};
use crate::memory::{BlockFactory, MemoryReservation};
use crate::types::{ElementType, Value};

/// Fixed bytes charged for every block on top of its buffers.
pub const BLOCK_OVERHEAD_BYTES: usize = 64;

pub(crate) struct BlockData<A: ValueStore> {
    pub(crate) position_count: usize,
    pub(crate) values: A,
    /// `position_count + 1` indexes; `None` when every position has exactly one value.
    pub(crate) first_value_indexes: Option<Box<[usize]>>,
    pub(crate) nulls: Option<NullMask>,
    pub(crate) multivalued: bool,
    pub(crate) reservation: MemoryReservation,
}

impl<A: ValueStore> BlockData<A> {
    #[inline]
    fn is_dense(&self) -> bool {
        self.first_value_indexes.is_none() && self.nulls.is_none()
    }
}

/// A block of one element type.
pub struct TypedBlock<A: ValueStore> {
    data: Arc<BlockData<A>>,
}

impl<A: ValueStore> Clone for TypedBlock<A> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<A: ValueStore> TypedBlock<A> {
    pub(crate) fn from_data(data: BlockData<A>) -> Self {
        Self {
            data: Arc::new(data),
        }
    }

    pub(crate) fn from_shared(data: Arc<BlockData<A>>) -> Self {
        Self { data }
    }

    /// Element type of the values.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        A::ELEMENT_TYPE
    }

    /// Number of positions.
    #[must_use]
    pub fn position_count(&self) -> usize {
        self.data.position_count
    }

    /// Returns whether `position` is null.
    #[inline]
    #[must_use]
    pub fn is_null(&self, position: usize) -> bool {
        self.data
            .nulls
            .as_ref()
            .is_some_and(|nulls| nulls.is_null(position))
    }

    /// Number of values at `position`; zero for null positions.
    #[inline]
    #[must_use]
    pub fn value_count(&self, position: usize) -> usize {
        match &self.data.first_value_indexes {
            None => 1,
            Some(indexes) => indexes[position + 1] - indexes[position],
        }
    }

    /// Index of the first value of `position` in the value store.
    #[inline]
    #[must_use]
    pub fn first_value_index(&self, position: usize) -> usize {
        match &self.data.first_value_indexes {
            None => position,
            Some(indexes) => indexes[position],
        }
    }

    /// Reads the value at `index` (a value index, not a position).
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> A::Value<'_> {
        self.data.values.get(index)
    }

    /// Total number of values across all positions.
    #[must_use]
    pub fn total_value_count(&self) -> usize {
        self.data.values.len()
    }

    /// Returns true if any position may be null.
    #[must_use]
    pub fn may_have_nulls(&self) -> bool {
        self.data.nulls.is_some()
    }

    /// Returns true if any position holds more than one value.
    #[must_use]
    pub fn may_have_multivalued_fields(&self) -> bool {
        self.data.multivalued
    }

    /// Returns the dense view if every position is non-null and single-valued.
    ///
    /// This check is O(1): density is decided when the block is built.
    #[must_use]
    pub fn as_vector(&self) -> Option<TypedVector<A>> {
        if self.data.is_dense() {
            Some(TypedVector::from_shared(Arc::clone(&self.data)))
        } else {
            None
        }
    }

    /// Bytes charged to the budget for this block.
    #[must_use]
    pub fn ram_bytes_used(&self) -> usize {
        self.data.reservation.bytes()
    }

    /// Number of live references to this block's buffers.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.data)
    }

    /// Iterates the values at `position`.
    pub fn values_at(&self, position: usize) -> impl Iterator<Item = A::Value<'_>> + '_ {
        let first = self.first_value_index(position);
        let count = if self.is_null(position) {
            0
        } else {
            self.value_count(position)
        };
        (first..first + count).map(move |i| self.get(i))
    }

    /// Copies the values at `position` out as [`Value`]s.
    #[must_use]
    pub fn position_values(&self, position: usize) -> Vec<Value> {
        self.values_at(position).map(A::to_value).collect()
    }

    /// Builds a new block keeping only `positions`, in the given order.
    ///
    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the factory cannot allocate the result.
    pub fn filter(&self, factory: &BlockFactory, positions: &[usize]) -> Result<Self> {
        let mut builder: BlockBuilder<A> = factory.new_block_builder(positions.len())?;
        for &position in positions {
            builder.copy_position(self, position);
        }
        builder.build()
    }
}

impl<A: ValueStore> fmt::Debug for TypedBlock<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for p in 0..self.position_count() {
            if self.is_null(p) {
                list.entry(&Value::Null);
            } else if self.value_count(p) == 1 {
                list.entry(&self.get(self.first_value_index(p)));
            } else {
                list.entry(&self.values_at(p).collect::<Vec<_>>());
            }
        }
        list.finish()
    }
}

/// Block of booleans.
pub type BooleanBlock = TypedBlock<PrimitiveValues<bool>>;
/// Block of 32-bit integers.
pub type IntBlock = TypedBlock<PrimitiveValues<i32>>;
/// Block of 64-bit integers.
pub type LongBlock = TypedBlock<PrimitiveValues<i64>>;
/// Block of doubles.
pub type DoubleBlock = TypedBlock<PrimitiveValues<f64>>;
/// Block of byte sequences.
pub type BytesRefBlock = TypedBlock<BytesRefValues>;

struct NullBlockData {
    position_count: usize,
    reservation: MemoryReservation,
}

/// A block whose every position is null. Usable wherever any type is expected.
#[derive(Clone)]
pub struct ConstantNullBlock {
    data: Arc<NullBlockData>,
}

impl ConstantNullBlock {
    pub(crate) fn new(position_count: usize, reservation: MemoryReservation) -> Self {
        Self {
            data: Arc::new(NullBlockData {
                position_count,
                reservation,
            }),
        }
    }

    /// Number of positions.
    #[must_use]
    pub fn position_count(&self) -> usize {
        self.data.position_count
    }

    /// Bytes charged to the budget for this block.
    #[must_use]
    pub fn ram_bytes_used(&self) -> usize {
        self.data.reservation.bytes()
    }

    /// Number of live references.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.data)
    }
}

impl fmt::Debug for ConstantNullBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConstantNullBlock[positions={}]", self.position_count())
    }
}

/// Any block, tagged with its element type.
#[derive(Clone, Debug)]
pub enum Block {
    Boolean(BooleanBlock),
    Int(IntBlock),
    Long(LongBlock),
    Double(DoubleBlock),
    BytesRef(BytesRefBlock),
    Null(ConstantNullBlock),
}

macro_rules! with_block {
    ($block:expr, $b:ident => $typed:expr, $n:ident => $null:expr) => {
        match $block {
            Block::Boolean($b) => $typed,
            Block::Int($b) => $typed,
            Block::Long($b) => $typed,
            Block::Double($b) => $typed,
            Block::BytesRef($b) => $typed,
            Block::Null($n) => $null,
        }
    };
}

impl<A: ValueStore> From<TypedBlock<A>> for Block {
    fn from(block: TypedBlock<A>) -> Self {
        A::wrap(block)
    }
}

impl From<ConstantNullBlock> for Block {
    fn from(block: ConstantNullBlock) -> Self {
        Block::Null(block)
    }
}

impl Block {
    /// Element type of the block.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        with_block!(self, b => b.element_type(), _n => ElementType::Null)
    }

    /// Number of positions.
    #[must_use]
    pub fn position_count(&self) -> usize {
        with_block!(self, b => b.position_count(), n => n.position_count())
    }

    /// Returns whether `position` is null.
    #[must_use]
    pub fn is_null(&self, position: usize) -> bool {
        with_block!(self, b => b.is_null(position), _n => true)
    }

    /// Number of values at `position`.
    #[must_use]
    pub fn value_count(&self, position: usize) -> usize {
        with_block!(self, b => if b.is_null(position) { 0 } else { b.value_count(position) }, _n => 0)
    }

    /// Index of the first value at `position`.
    #[must_use]
    pub fn first_value_index(&self, position: usize) -> usize {
        with_block!(self, b => b.first_value_index(position), _n => 0)
    }

    /// Returns true if every position is non-null and single-valued.
    #[must_use]
    pub fn is_dense(&self) -> bool {
        with_block!(self, b => b.as_vector().is_some(), _n => false)
    }

    /// Returns true if any position may hold more than one value.
    #[must_use]
    pub fn may_have_multivalued_fields(&self) -> bool {
        with_block!(self, b => b.may_have_multivalued_fields(), _n => false)
    }

    /// Bytes charged to the budget for this block.
    #[must_use]
    pub fn ram_bytes_used(&self) -> usize {
        with_block!(self, b => b.ram_bytes_used(), n => n.ram_bytes_used())
    }

    /// Number of live references to this block's buffers.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        with_block!(self, b => b.ref_count(), n => n.ref_count())
    }

    /// Copies the values at `position` out as [`Value`]s; empty when null.
    #[must_use]
    pub fn position_values(&self, position: usize) -> Vec<Value> {
        with_block!(self, b => b.position_values(position), _n => Vec::new())
    }

    /// Returns the single value at `position`, or `Value::Null` when the
    /// position is null or multi-valued.
    #[must_use]
    pub fn value(&self, position: usize) -> Value {
        let mut values = self.position_values(position);
        if values.len() == 1 {
            values.swap_remove(0)
        } else {
            Value::Null
        }
    }

    /// Returns the typed block, failing fast on a mismatched element type.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the block holds another element type.
    pub fn downcast<A: ValueStore>(&self) -> Result<&TypedBlock<A>> {
        A::downcast(self).ok_or(ColexecError::TypeMismatch {
            expected: A::ELEMENT_TYPE,
            actual: self.element_type(),
        })
    }

    /// Returns the boolean block.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for other element types.
    pub fn as_boolean_block(&self) -> Result<&BooleanBlock> {
        self.downcast()
    }

    /// Returns the int block.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for other element types.
    pub fn as_int_block(&self) -> Result<&IntBlock> {
        self.downcast()
    }

    /// Returns the long block.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for other element types.
    pub fn as_long_block(&self) -> Result<&LongBlock> {
        self.downcast()
    }

    /// Returns the double block.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for other element types.
    pub fn as_double_block(&self) -> Result<&DoubleBlock> {
        self.downcast()
    }

    /// Returns the bytes block.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for other element types.
    pub fn as_bytes_ref_block(&self) -> Result<&BytesRefBlock> {
        self.downcast()
    }

    /// Builds a new block keeping only `positions`.
    ///
    /// # Errors
    ///
    /// Returns `BudgetExceeded` if the factory cannot allocate the result.
    pub fn filter(&self, factory: &BlockFactory, positions: &[usize]) -> Result<Block> {
        with_block!(
            self,
            b => b.filter(factory, positions).map(Block::from),
            _n => factory.new_constant_null_block(positions.len())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{BlockFactory, MemoryBudget};

    fn factory() -> BlockFactory {
        BlockFactory::new(MemoryBudget::unbounded("test"))
    }

    #[test]
    fn test_dense_block_has_vector() {
        let factory = factory();
        let mut builder = factory.new_long_block_builder(3).unwrap();
        builder.append_value(1).append_value(2).append_value(3);
        let block = builder.build().unwrap();
        let vector = block.as_vector().expect("dense block");
        assert_eq!(vector.get(2), 3);
        assert!(!block.may_have_nulls());
    }

    #[test]
    fn test_nullable_block_has_no_vector() {
        let factory = factory();
        let mut builder = factory.new_long_block_builder(2).unwrap();
        builder.append_null().append_value(5);
        let block = builder.build().unwrap();
        assert!(block.as_vector().is_none());
        assert!(block.is_null(0));
        assert_eq!(block.value_count(0), 0);
        assert_eq!(block.value_count(1), 1);
        assert_eq!(block.get(block.first_value_index(1)), 5);
    }

    #[test]
    fn test_multivalued_block() {
        let factory = factory();
        let mut builder = factory.new_bytes_ref_block_builder(2).unwrap();
        builder
            .begin_position_entry()
            .append_value(b"a")
            .append_value(b"b")
            .end_position_entry()
            .append_value(b"c");
        let block = builder.build().unwrap();
        assert!(block.as_vector().is_none());
        assert!(block.may_have_multivalued_fields());
        assert_eq!(block.value_count(0), 2);
        assert_eq!(block.first_value_index(1), 2);
        assert_eq!(
            block.position_values(0),
            vec![Value::keyword("a"), Value::keyword("b")]
        );
    }

    #[test]
    fn test_clone_shares_and_drop_releases() {
        let budget = MemoryBudget::unbounded("test");
        let factory = BlockFactory::new(budget.clone());
        let block = {
            let mut builder = factory.new_int_block_builder(4).unwrap();
            builder.append_value(1).append_value(2);
            builder.build().unwrap()
        };
        let used = budget.used();
        assert_eq!(used, block.ram_bytes_used());
        let shared = block.clone();
        assert_eq!(block.ref_count(), 2);
        drop(block);
        assert_eq!(budget.used(), used);
        assert_eq!(shared.ref_count(), 1);
        drop(shared);
        assert_eq!(budget.used(), 0);
    }

    #[test]
    fn test_downcast_mismatch() {
        let factory = factory();
        let block: Block = factory.new_array_vector(vec![1_i32, 2]).unwrap().into_block().into();
        assert!(block.as_int_block().is_ok());
        match block.as_long_block() {
            Err(ColexecError::TypeMismatch { expected, actual }) => {
                assert_eq!(expected, ElementType::Long);
                assert_eq!(actual, ElementType::Int);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_filter_keeps_nulls_and_multivalues() {
        let factory = factory();
        let mut builder = factory.new_long_block_builder(4).unwrap();
        builder
            .append_value(10)
            .append_null()
            .begin_position_entry()
            .append_value(1)
            .append_value(2)
            .end_position_entry()
            .append_value(40);
        let block: Block = builder.build().unwrap().into();
        let filtered = block.filter(&factory, &[3, 2, 1]).unwrap();
        assert_eq!(filtered.position_count(), 3);
        assert_eq!(filtered.value(0), Value::Long(40));
        assert_eq!(
            filtered.position_values(1),
            vec![Value::Long(1), Value::Long(2)]
        );
        assert!(filtered.is_null(2));
    }

    #[test]
    fn test_filter_dense_result_is_dense() {
        let factory = factory();
        let mut builder = factory.new_long_block_builder(3).unwrap();
        builder.append_value(1).append_null().append_value(3);
        let block: Block = builder.build().unwrap().into();
        let filtered = block.filter(&factory, &[0, 2]).unwrap();
        assert!(filtered.is_dense());
    }

    #[test]
    fn test_constant_null_block() {
        let factory = factory();
        let block = factory.new_constant_null_block(3).unwrap();
        assert_eq!(block.element_type(), ElementType::Null);
        assert!(block.is_null(2));
        assert_eq!(block.value(0), Value::Null);
        assert!(!block.is_dense());
    }
}
