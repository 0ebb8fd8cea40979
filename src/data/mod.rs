//! Columnar value model: blocks, vectors and pages.
//!
//! A [`Block`] is the general container (nullable, possibly multi-valued).
//! A vector is the dense, non-null, single-valued specialization, obtained
//! from a block with `as_vector`. A [`Page`] is a batch of aligned blocks.

mod block;
mod builder;
mod interop;
mod nulls;
mod page;
mod values;
mod vector;

pub use block::{
    Block, BooleanBlock, BytesRefBlock, ConstantNullBlock, DoubleBlock, IntBlock, LongBlock,
    TypedBlock, BLOCK_OVERHEAD_BYTES,
};
pub use builder::{
    BlockBuilder, BooleanBlockBuilder, BooleanVectorBuilder, BytesRefBlockBuilder,
    BytesRefVectorBuilder, DoubleBlockBuilder, DoubleVectorBuilder, IntBlockBuilder,
    IntVectorBuilder, LongBlockBuilder, LongVectorBuilder, VectorBuilder,
};
pub(crate) use builder::{estimate_block_bytes, estimate_vector_bytes};
pub use interop::{block_from_arrow, block_to_arrow, page_to_record_batch};
pub use nulls::NullMask;
pub use page::Page;
pub use values::{
    BytesRefValues, BytesRefValuesBuilder, Primitive, PrimitiveValues, PrimitiveValuesBuilder,
    ValueStore, ValueStoreBuilder,
};
pub use vector::{
    BooleanVector, BytesRefVector, DoubleVector, IntVector, LongVector, TypedVector,
};
