//! Expression evaluators.
//!
//! An [`EvaluatorFactory`] is an immutable description of an expression,
//! shared by every partition. [`EvaluatorFactory::get`] binds it to one
//! [`DriverContext`], producing an [`ExpressionEvaluator`] that turns each
//! [`Page`] into one result [`Block`].
//!
//! Operators are specialized per concrete element type: each combination is
//! its own monomorphized evaluator, chosen once when the expression is mapped
//! and never re-checked per value. Every evaluator follows the same rule for
//! nulls: a result position is null if any operand is null or multi-valued
//! there.

mod arithmetic;
mod binary;
mod cast;
mod comparison;
mod convert;
mod leaf;
mod logical;
mod unary;

use std::fmt;
use std::sync::Arc;

use crate::config::ValueErrorPolicy;
use crate::data::{Block, Page};
use crate::error::{ColexecError, Result, ValueError};
use crate::memory::DriverContext;

pub use arithmetic::{
    arithmetic_factory, AddDoubles, AddInts, AddLongs, ArithmeticOp, DivDoubles, DivInts,
    DivLongs, ModDoubles, ModInts, ModLongs, MulDoubles, MulInts, MulLongs, NegDoubles, NegInts,
    NegLongs, SubDoubles, SubInts, SubLongs,
};
pub use binary::{BinaryEvaluator, BinaryFactory, BinaryOp};
pub use cast::{CastIntToDouble, CastIntToLong, CastLongToDouble};
pub use comparison::{
    comparison_factory, ComparisonOp, EqualsBooleans, EqualsDoubles, EqualsInts,
    EqualsKeywords, EqualsLongs, GreaterThanDoubles, GreaterThanInts, GreaterThanKeywords,
    GreaterThanLongs, GreaterThanOrEqualDoubles, GreaterThanOrEqualInts,
    GreaterThanOrEqualKeywords, GreaterThanOrEqualLongs, LessThanDoubles, LessThanInts,
    LessThanKeywords, LessThanLongs, LessThanOrEqualDoubles, LessThanOrEqualInts,
    LessThanOrEqualKeywords, LessThanOrEqualLongs, NotEqualsBooleans, NotEqualsDoubles,
    NotEqualsInts, NotEqualsKeywords, NotEqualsLongs,
};
pub use convert::{
    ToBooleanFromString, ToDatetimeFromString, ToDoubleFromString, ToGeoPointFromString,
    ToIntegerFromString, ToLongFromString,
};
pub use leaf::{ChannelFactory, LiteralFactory};
pub use logical::Not;
pub use unary::{UnaryEvaluator, UnaryFactory, UnaryOp};

/// Computes one block per page.
///
/// Dropping the evaluator releases its children and any cached buffers.
pub trait ExpressionEvaluator: fmt::Display + Send {
    /// Evaluates the expression against `page`.
    ///
    /// The result has `page.position_count()` positions. Input blocks are
    /// never modified. On error every block built during the call has been
    /// released.
    ///
    /// # Errors
    ///
    /// Returns `BudgetExceeded` when an allocation does not fit,
    /// `TypeMismatch` when an input block has an unexpected element type,
    /// and `InvalidValue` for a failing position under
    /// [`ValueErrorPolicy::Fail`].
    fn eval(&mut self, page: &Page) -> Result<Block>;
}

/// Stateless, shareable description of an expression.
pub trait EvaluatorFactory: fmt::Display + Send + Sync {
    /// Builds a new evaluator bound to `ctx`, recursively building children
    /// against the same context.
    fn get(&self, ctx: &DriverContext) -> Box<dyn ExpressionEvaluator>;
}

/// A factory shared across partitions.
pub type SharedFactory = Arc<dyn EvaluatorFactory>;

/// Routes position-local failures according to the value-error policy.
#[derive(Debug, Clone)]
pub(crate) struct ValueErrorHandler {
    ctx: DriverContext,
    policy: ValueErrorPolicy,
    source: String,
}

impl ValueErrorHandler {
    pub(crate) fn new(ctx: &DriverContext, policy: Option<ValueErrorPolicy>, source: String) -> Self {
        Self {
            ctx: ctx.clone(),
            policy: policy.unwrap_or_else(|| ctx.value_error_policy()),
            source,
        }
    }

    /// Returns `Ok` when the position should become null, or the error that
    /// aborts the evaluation.
    pub(crate) fn handle(&self, position: usize, error: ValueError) -> Result<()> {
        match self.policy {
            ValueErrorPolicy::NullWithWarning => {
                self.ctx.warnings().register(&self.source, position, &error);
                Ok(())
            }
            ValueErrorPolicy::Fail => Err(ColexecError::InvalidValue {
                position,
                source: error,
            }),
        }
    }
}
