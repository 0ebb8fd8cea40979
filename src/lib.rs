//! colexec - vectorized columnar expression evaluation
//!
//! Pages of typed blocks flow through pull-based operators. Expressions are
//! bound once to evaluators specialized for their operand types; every buffer
//! an evaluator builds is reserved against a hierarchical memory budget and
//! released when its last reference is dropped.
//!
//! ```no_run
//! use colexec::{DataType, DriverConfig, DriverContext, Expression, Page, Value};
//! use colexec::evaluator::ComparisonOp;
//!
//! # fn main() -> colexec::Result<()> {
//! let ctx = DriverContext::new(&DriverConfig::default());
//! let predicate = Expression::comparison(
//!     Expression::column(0, DataType::Keyword),
//!     ComparisonOp::Eq,
//!     Expression::literal(Value::keyword("x")),
//! )
//! .to_factory()?;
//!
//! let names = ctx
//!     .block_factory()
//!     .new_bytes_ref_array_vector(&["x", "y"])?
//!     .into_block();
//! let page = Page::new(vec![names.into()])?;
//! let mask = predicate.get(&ctx).eval(&page)?;
//! assert_eq!(mask.value(0), Value::Boolean(true));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod expression;
pub mod memory;
pub mod types;

pub use config::{DriverConfig, ValueErrorPolicy};
pub use data::{Block, Page};
pub use error::{ColexecError, Result, ValueError};
pub use evaluator::{EvaluatorFactory, ExpressionEvaluator, SharedFactory};
pub use executor::{Driver, PartitionRunner, PipelineFactory};
pub use expression::Expression;
pub use memory::{BlockFactory, DriverContext, MemoryBudget};
pub use types::{DataType, ElementType, Value};
