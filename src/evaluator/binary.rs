//! Two-operand evaluators.
//!
//! A [`BinaryOp`] is a scalar function over one pair of element types. The
//! generic [`BinaryEvaluator`] turns it into the two loops every binary
//! operator needs: a dense loop over vectors with no per-position checks, and
//! a general loop over blocks that emits null wherever an operand is null or
//! multi-valued.

use std::fmt;
use std::marker::PhantomData;

use tracing::trace;

use crate::config::ValueErrorPolicy;
use crate::data::{Block, Page, Primitive, PrimitiveValues, TypedBlock, TypedVector, ValueStore};
use crate::error::{ColexecError, Result, ValueError};
use crate::evaluator::{EvaluatorFactory, ExpressionEvaluator, SharedFactory, ValueErrorHandler};
use crate::memory::DriverContext;

/// A scalar function of two operands.
pub trait BinaryOp: Send + Sync + 'static {
    /// Evaluator name, e.g. `EqualsKeywords`.
    const NAME: &'static str;

    /// Whether `process` can fail for some inputs. Fallible operators build
    /// their dense result as a block so a failing position can become null.
    const FALLIBLE: bool = false;

    type Lhs: ValueStore;
    type Rhs: ValueStore;
    type Out: Primitive;

    /// Applies the operation to one pair of values.
    ///
    /// # Errors
    ///
    /// Returns the position-local failure, if any.
    fn process(
        lhs: <Self::Lhs as ValueStore>::Value<'_>,
        rhs: <Self::Rhs as ValueStore>::Value<'_>,
    ) -> std::result::Result<Self::Out, ValueError>;
}

/// Declares a unit struct implementing [`BinaryOp`].
///
/// The plain form wraps an infallible body in `Ok`; the `try` form takes a
/// body that already returns `Result<_, ValueError>`.
macro_rules! binary_op {
    ($(#[$meta:meta])* $name:ident($lhs:ty, $rhs:ty) -> $out:ty, |$a:ident, $b:ident| $body:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl $crate::evaluator::BinaryOp for $name {
            const NAME: &'static str = stringify!($name);
            type Lhs = $lhs;
            type Rhs = $rhs;
            type Out = $out;

            #[inline]
            fn process(
                $a: <$lhs as $crate::data::ValueStore>::Value<'_>,
                $b: <$rhs as $crate::data::ValueStore>::Value<'_>,
            ) -> ::std::result::Result<$out, $crate::error::ValueError> {
                Ok($body)
            }
        }
    };
    ($(#[$meta:meta])* $name:ident($lhs:ty, $rhs:ty) -> $out:ty, try |$a:ident, $b:ident| $body:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl $crate::evaluator::BinaryOp for $name {
            const NAME: &'static str = stringify!($name);
            const FALLIBLE: bool = true;
            type Lhs = $lhs;
            type Rhs = $rhs;
            type Out = $out;

            #[inline]
            fn process(
                $a: <$lhs as $crate::data::ValueStore>::Value<'_>,
                $b: <$rhs as $crate::data::ValueStore>::Value<'_>,
            ) -> ::std::result::Result<$out, $crate::error::ValueError> {
                $body
            }
        }
    };
}

pub(crate) use binary_op;

/// Evaluator for a [`BinaryOp`], bound to one driver context.
pub struct BinaryEvaluator<O: BinaryOp> {
    lhs: Box<dyn ExpressionEvaluator>,
    rhs: Box<dyn ExpressionEvaluator>,
    ctx: DriverContext,
    errors: ValueErrorHandler,
    _op: PhantomData<fn() -> O>,
}

impl<O: BinaryOp> BinaryEvaluator<O> {
    /// Creates an evaluator over two bound children.
    #[must_use]
    pub fn new(
        lhs: Box<dyn ExpressionEvaluator>,
        rhs: Box<dyn ExpressionEvaluator>,
        ctx: &DriverContext,
        policy: Option<ValueErrorPolicy>,
    ) -> Self {
        let source = format!("{}Evaluator[lhs={lhs}, rhs={rhs}]", O::NAME);
        Self {
            errors: ValueErrorHandler::new(ctx, policy, source),
            lhs,
            rhs,
            ctx: ctx.clone(),
            _op: PhantomData,
        }
    }

    /// Dense loop over two vectors.
    pub fn eval_vectors(
        &self,
        lhs: &TypedVector<O::Lhs>,
        rhs: &TypedVector<O::Rhs>,
    ) -> Result<Block> {
        let positions = lhs.position_count();
        let factory = self.ctx.block_factory();
        if O::FALLIBLE {
            let mut result = factory.new_block_builder::<PrimitiveValues<O::Out>>(positions)?;
            for p in 0..positions {
                match O::process(lhs.get(p), rhs.get(p)) {
                    Ok(value) => {
                        result.append_value(value);
                    }
                    Err(e) => {
                        self.errors.handle(p, e)?;
                        result.append_null();
                    }
                }
            }
            return Ok(result.build()?.into());
        }

        let mut result = factory.new_vector_builder::<PrimitiveValues<O::Out>>(positions)?;
        for p in 0..positions {
            let value = O::process(lhs.get(p), rhs.get(p))
                .map_err(|source| ColexecError::InvalidValue { position: p, source })?;
            result.append_value(value);
        }
        Ok(result.build()?.into_block().into())
    }

    /// General loop over two blocks.
    pub fn eval_blocks(&self, lhs: &TypedBlock<O::Lhs>, rhs: &TypedBlock<O::Rhs>) -> Result<Block> {
        let positions = lhs.position_count();
        let mut result = self
            .ctx
            .block_factory()
            .new_block_builder::<PrimitiveValues<O::Out>>(positions)?;
        for p in 0..positions {
            if lhs.is_null(p) || rhs.is_null(p) || lhs.value_count(p) != 1 || rhs.value_count(p) != 1
            {
                result.append_null();
                continue;
            }
            let l = lhs.get(lhs.first_value_index(p));
            let r = rhs.get(rhs.first_value_index(p));
            match O::process(l, r) {
                Ok(value) => {
                    result.append_value(value);
                }
                Err(e) => {
                    self.errors.handle(p, e)?;
                    result.append_null();
                }
            }
        }
        Ok(result.build()?.into())
    }
}

impl<O: BinaryOp> ExpressionEvaluator for BinaryEvaluator<O> {
    fn eval(&mut self, page: &Page) -> Result<Block> {
        let lhs_block = self.lhs.eval(page)?;
        let rhs_block = self.rhs.eval(page)?;
        let positions = page.position_count();
        for block in [&lhs_block, &rhs_block] {
            if block.position_count() != positions {
                return Err(ColexecError::PositionCountMismatch {
                    expected: positions,
                    actual: block.position_count(),
                });
            }
        }
        // type-check the non-null side even when the other side is all null
        let lhs = match &lhs_block {
            Block::Null(_) => None,
            block => Some(block.downcast::<O::Lhs>()?),
        };
        let rhs = match &rhs_block {
            Block::Null(_) => None,
            block => Some(block.downcast::<O::Rhs>()?),
        };
        let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
            return self.ctx.block_factory().new_constant_null_block(positions);
        };
        if let (Some(lv), Some(rv)) = (lhs.as_vector(), rhs.as_vector()) {
            return self.eval_vectors(&lv, &rv);
        }
        self.eval_blocks(lhs, rhs)
    }
}

impl<O: BinaryOp> fmt::Display for BinaryEvaluator<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Evaluator[lhs={}, rhs={}]", O::NAME, self.lhs, self.rhs)
    }
}

/// Factory for [`BinaryEvaluator`]s.
pub struct BinaryFactory<O: BinaryOp> {
    lhs: SharedFactory,
    rhs: SharedFactory,
    policy: Option<ValueErrorPolicy>,
    _op: PhantomData<fn() -> O>,
}

impl<O: BinaryOp> BinaryFactory<O> {
    /// Creates a factory over two child factories.
    #[must_use]
    pub fn new(lhs: SharedFactory, rhs: SharedFactory) -> Self {
        Self {
            lhs,
            rhs,
            policy: None,
            _op: PhantomData,
        }
    }

    /// Overrides the driver context's value-error policy for this operator.
    #[must_use]
    pub fn with_value_error_policy(mut self, policy: ValueErrorPolicy) -> Self {
        self.policy = Some(policy);
        self
    }
}

impl<O: BinaryOp> EvaluatorFactory for BinaryFactory<O> {
    fn get(&self, ctx: &DriverContext) -> Box<dyn ExpressionEvaluator> {
        trace!(evaluator = O::NAME, driver = %ctx.id(), "building binary evaluator");
        Box::new(BinaryEvaluator::<O>::new(
            self.lhs.get(ctx),
            self.rhs.get(ctx),
            ctx,
            self.policy,
        ))
    }
}

impl<O: BinaryOp> fmt::Display for BinaryFactory<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Evaluator[lhs={}, rhs={}]", O::NAME, self.lhs, self.rhs)
    }
}
