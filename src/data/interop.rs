//! Conversion between blocks and Arrow arrays.
//!
//! Single-valued blocks export as flat arrays of the matching Arrow type;
//! blocks with multi-valued positions export as `List` arrays. Imports accept
//! the flat types only.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayBuilder, ArrayRef, AsArray, BinaryBuilder, BooleanBuilder, Float64Builder,
    Int32Builder, Int64Builder, ListBuilder, NullArray,
};
use arrow::datatypes::{DataType as ArrowDataType, Field, Float64Type, Int32Type, Int64Type, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};

use crate::data::block::{Block, TypedBlock};
use crate::data::page::Page;
use crate::data::values::{BytesRefValues, PrimitiveValues, ValueStore};
use crate::error::{ColexecError, Result};
use crate::memory::BlockFactory;

/// A value store with a matching nullable Arrow builder.
trait ArrowExport: ValueStore {
    type ArrowBuilder: ArrayBuilder + Default;

    fn append(builder: &mut Self::ArrowBuilder, value: Self::Value<'_>);

    fn append_null(builder: &mut Self::ArrowBuilder);
}

macro_rules! impl_arrow_export {
    ($store:ty, $builder:ty) => {
        impl ArrowExport for $store {
            type ArrowBuilder = $builder;

            fn append(builder: &mut $builder, value: Self::Value<'_>) {
                builder.append_value(value);
            }

            fn append_null(builder: &mut $builder) {
                builder.append_null();
            }
        }
    };
}

impl_arrow_export!(PrimitiveValues<bool>, BooleanBuilder);
impl_arrow_export!(PrimitiveValues<i32>, Int32Builder);
impl_arrow_export!(PrimitiveValues<i64>, Int64Builder);
impl_arrow_export!(PrimitiveValues<f64>, Float64Builder);
impl_arrow_export!(BytesRefValues, BinaryBuilder);

fn typed_to_arrow<A: ArrowExport>(block: &TypedBlock<A>) -> ArrayRef {
    let positions = block.position_count();
    if !block.may_have_multivalued_fields() {
        let mut builder = A::ArrowBuilder::default();
        for p in 0..positions {
            if block.is_null(p) {
                A::append_null(&mut builder);
            } else {
                A::append(&mut builder, block.get(block.first_value_index(p)));
            }
        }
        return ArrayBuilder::finish(&mut builder);
    }

    let mut list = ListBuilder::new(A::ArrowBuilder::default());
    for p in 0..positions {
        if block.is_null(p) {
            list.append(false);
            continue;
        }
        for value in block.values_at(p) {
            A::append(list.values(), value);
        }
        list.append(true);
    }
    Arc::new(list.finish())
}

/// Exports a block as an Arrow array.
#[must_use]
pub fn block_to_arrow(block: &Block) -> ArrayRef {
    match block {
        Block::Boolean(b) => typed_to_arrow(b),
        Block::Int(b) => typed_to_arrow(b),
        Block::Long(b) => typed_to_arrow(b),
        Block::Double(b) => typed_to_arrow(b),
        Block::BytesRef(b) => typed_to_arrow(b),
        Block::Null(b) => Arc::new(NullArray::new(b.position_count())),
    }
}

/// Exports a page as a record batch with one nullable column per block.
///
/// # Errors
///
/// Returns `InvalidArgument` if `names` does not name every block, or an
/// Arrow error if the batch cannot be assembled.
pub fn page_to_record_batch(page: &Page, names: &[&str]) -> Result<RecordBatch> {
    if names.len() != page.block_count() {
        return Err(ColexecError::InvalidArgument(format!(
            "expected {} column names, got {}",
            page.block_count(),
            names.len()
        )));
    }
    let columns: Vec<ArrayRef> = page.blocks().iter().map(block_to_arrow).collect();
    let fields: Vec<Field> = names
        .iter()
        .zip(&columns)
        .map(|(name, column)| Field::new(*name, column.data_type().clone(), true))
        .collect();
    let options = RecordBatchOptions::new().with_row_count(Some(page.position_count()));
    Ok(RecordBatch::try_new_with_options(
        Arc::new(Schema::new(fields)),
        columns,
        &options,
    )?)
}

fn import<'v, A: ValueStore>(
    factory: &BlockFactory,
    len: usize,
    is_null: impl Fn(usize) -> bool,
    value: impl Fn(usize) -> A::Value<'v>,
) -> Result<Block>
where
    A: 'v,
{
    let mut builder = factory.new_block_builder::<A>(len)?;
    for i in 0..len {
        if is_null(i) {
            builder.append_null();
        } else {
            builder.append_value(value(i));
        }
    }
    Ok(builder.build()?.into())
}

/// Imports a flat Arrow array as a block charged to `factory`.
///
/// Strings import as byte sequences. Arrays without nulls import as dense
/// blocks.
///
/// # Errors
///
/// Returns `UnsupportedOperation` for Arrow types with no block counterpart
/// and `BudgetExceeded` if the block does not fit.
pub fn block_from_arrow(factory: &BlockFactory, array: &dyn Array) -> Result<Block> {
    let len = array.len();
    let is_null = |i: usize| array.is_null(i);
    match array.data_type() {
        ArrowDataType::Null => factory.new_constant_null_block(len),
        ArrowDataType::Boolean => {
            let a = array.as_boolean();
            import::<PrimitiveValues<bool>>(factory, len, is_null, |i| a.value(i))
        }
        ArrowDataType::Int32 => {
            let a = array.as_primitive::<Int32Type>();
            import::<PrimitiveValues<i32>>(factory, len, is_null, |i| a.value(i))
        }
        ArrowDataType::Int64 => {
            let a = array.as_primitive::<Int64Type>();
            import::<PrimitiveValues<i64>>(factory, len, is_null, |i| a.value(i))
        }
        ArrowDataType::Float64 => {
            let a = array.as_primitive::<Float64Type>();
            import::<PrimitiveValues<f64>>(factory, len, is_null, |i| a.value(i))
        }
        ArrowDataType::Binary => {
            let a = array.as_binary::<i32>();
            import::<BytesRefValues>(factory, len, is_null, |i| a.value(i))
        }
        ArrowDataType::Utf8 => {
            let a = array.as_string::<i32>();
            import::<BytesRefValues>(factory, len, is_null, |i| a.value(i).as_bytes())
        }
        other => Err(ColexecError::UnsupportedOperation(format!(
            "cannot import Arrow type {other} as a block"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBudget;
    use crate::types::Value;
    use arrow::array::{Int64Array, ListArray, StringArray};

    fn factory() -> BlockFactory {
        BlockFactory::new(MemoryBudget::unbounded("test"))
    }

    #[test]
    fn test_export_nullable_long() {
        let factory = factory();
        let mut builder = factory.new_long_block_builder(3).unwrap();
        builder.append_value(1).append_null().append_value(3);
        let block: Block = builder.build().unwrap().into();
        let array = block_to_arrow(&block);
        let longs = array.as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(longs.len(), 3);
        assert!(longs.is_null(1));
        assert_eq!(longs.value(2), 3);
    }

    #[test]
    fn test_export_multivalued_as_list() {
        let factory = factory();
        let mut builder = factory.new_int_block_builder(2).unwrap();
        builder
            .begin_position_entry()
            .append_value(1)
            .append_value(2)
            .end_position_entry()
            .append_null();
        let block: Block = builder.build().unwrap().into();
        let array = block_to_arrow(&block);
        let list = array.as_any().downcast_ref::<ListArray>().unwrap();
        assert_eq!(list.value_length(0), 2);
        assert!(list.is_null(1));
    }

    #[test]
    fn test_import_strings() {
        let factory = factory();
        let array = StringArray::from(vec![Some("a"), None, Some("c")]);
        let block = block_from_arrow(&factory, &array).unwrap();
        assert_eq!(block.value(0), Value::keyword("a"));
        assert!(block.is_null(1));
        assert!(!block.is_dense());
    }

    #[test]
    fn test_import_dense_longs() {
        let factory = factory();
        let array = Int64Array::from(vec![4, 5]);
        let block = block_from_arrow(&factory, &array).unwrap();
        assert!(block.is_dense());
        assert_eq!(block.value(1), Value::Long(5));
    }

    #[test]
    fn test_page_to_record_batch() {
        let factory = factory();
        let longs: Block = factory.new_array_vector(vec![1_i64, 2]).unwrap().into_block().into();
        let nulls = factory.new_constant_null_block(2).unwrap();
        let page = Page::new(vec![longs, nulls]).unwrap();
        let batch = page_to_record_batch(&page, &["a", "b"]).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(1).data_type(), &ArrowDataType::Null);
        assert!(page_to_record_batch(&page, &["a"]).is_err());
    }
}
