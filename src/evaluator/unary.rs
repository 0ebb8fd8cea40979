//! Single-operand evaluators: negation, casts and conversions.

use std::fmt;
use std::marker::PhantomData;

use tracing::trace;

use crate::config::ValueErrorPolicy;
use crate::data::{Block, Page, Primitive, PrimitiveValues, TypedBlock, TypedVector, ValueStore};
use crate::error::{ColexecError, Result, ValueError};
use crate::evaluator::{EvaluatorFactory, ExpressionEvaluator, SharedFactory, ValueErrorHandler};
use crate::memory::DriverContext;

/// A scalar function of one operand.
pub trait UnaryOp: Send + Sync + 'static {
    /// Evaluator name, e.g. `ToLongFromString`.
    const NAME: &'static str;

    /// Whether `process` can fail for some inputs.
    const FALLIBLE: bool = false;

    type In: ValueStore;
    type Out: Primitive;

    /// Applies the operation to one value.
    ///
    /// # Errors
    ///
    /// Returns the position-local failure, if any.
    fn process(value: <Self::In as ValueStore>::Value<'_>)
        -> std::result::Result<Self::Out, ValueError>;
}

/// Declares a unit struct implementing [`UnaryOp`]. Same two forms as
/// `binary_op!`.
macro_rules! unary_op {
    ($(#[$meta:meta])* $name:ident($in:ty) -> $out:ty, |$v:ident| $body:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl $crate::evaluator::UnaryOp for $name {
            const NAME: &'static str = stringify!($name);
            type In = $in;
            type Out = $out;

            #[inline]
            fn process(
                $v: <$in as $crate::data::ValueStore>::Value<'_>,
            ) -> ::std::result::Result<$out, $crate::error::ValueError> {
                Ok($body)
            }
        }
    };
    ($(#[$meta:meta])* $name:ident($in:ty) -> $out:ty, try |$v:ident| $body:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl $crate::evaluator::UnaryOp for $name {
            const NAME: &'static str = stringify!($name);
            const FALLIBLE: bool = true;
            type In = $in;
            type Out = $out;

            #[inline]
            fn process(
                $v: <$in as $crate::data::ValueStore>::Value<'_>,
            ) -> ::std::result::Result<$out, $crate::error::ValueError> {
                $body
            }
        }
    };
}

pub(crate) use unary_op;

/// Evaluator for a [`UnaryOp`], bound to one driver context.
pub struct UnaryEvaluator<O: UnaryOp> {
    field: Box<dyn ExpressionEvaluator>,
    ctx: DriverContext,
    errors: ValueErrorHandler,
    _op: PhantomData<fn() -> O>,
}

impl<O: UnaryOp> UnaryEvaluator<O> {
    #[must_use]
    pub fn new(
        field: Box<dyn ExpressionEvaluator>,
        ctx: &DriverContext,
        policy: Option<ValueErrorPolicy>,
    ) -> Self {
        let source = format!("{}Evaluator[field={field}]", O::NAME);
        Self {
            errors: ValueErrorHandler::new(ctx, policy, source),
            field,
            ctx: ctx.clone(),
            _op: PhantomData,
        }
    }

    /// Dense loop over a vector.
    pub fn eval_vector(&self, vector: &TypedVector<O::In>) -> Result<Block> {
        let positions = vector.position_count();
        let factory = self.ctx.block_factory();
        if O::FALLIBLE {
            let mut result = factory.new_block_builder::<PrimitiveValues<O::Out>>(positions)?;
            for p in 0..positions {
                match O::process(vector.get(p)) {
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
            let value = O::process(vector.get(p))
                .map_err(|source| ColexecError::InvalidValue { position: p, source })?;
            result.append_value(value);
        }
        Ok(result.build()?.into_block().into())
    }

    /// General loop over a block.
    pub fn eval_block(&self, block: &TypedBlock<O::In>) -> Result<Block> {
        let positions = block.position_count();
        let mut result = self
            .ctx
            .block_factory()
            .new_block_builder::<PrimitiveValues<O::Out>>(positions)?;
        for p in 0..positions {
            if block.is_null(p) || block.value_count(p) != 1 {
                result.append_null();
                continue;
            }
            match O::process(block.get(block.first_value_index(p))) {
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

impl<O: UnaryOp> ExpressionEvaluator for UnaryEvaluator<O> {
    fn eval(&mut self, page: &Page) -> Result<Block> {
        let field_block = self.field.eval(page)?;
        if field_block.position_count() != page.position_count() {
            return Err(ColexecError::PositionCountMismatch {
                expected: page.position_count(),
                actual: field_block.position_count(),
            });
        }
        if matches!(field_block, Block::Null(_)) {
            return self
                .ctx
                .block_factory()
                .new_constant_null_block(page.position_count());
        }
        let block = field_block.downcast::<O::In>()?;
        match block.as_vector() {
            Some(vector) => self.eval_vector(&vector),
            None => self.eval_block(block),
        }
    }
}

impl<O: UnaryOp> fmt::Display for UnaryEvaluator<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Evaluator[field={}]", O::NAME, self.field)
    }
}

/// Factory for [`UnaryEvaluator`]s.
pub struct UnaryFactory<O: UnaryOp> {
    field: SharedFactory,
    policy: Option<ValueErrorPolicy>,
    _op: PhantomData<fn() -> O>,
}

impl<O: UnaryOp> UnaryFactory<O> {
    #[must_use]
    pub fn new(field: SharedFactory) -> Self {
        Self {
            field,
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

impl<O: UnaryOp> EvaluatorFactory for UnaryFactory<O> {
    fn get(&self, ctx: &DriverContext) -> Box<dyn ExpressionEvaluator> {
        trace!(evaluator = O::NAME, driver = %ctx.id(), "building unary evaluator");
        Box::new(UnaryEvaluator::<O>::new(self.field.get(ctx), ctx, self.policy))
    }
}

impl<O: UnaryOp> fmt::Display for UnaryFactory<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Evaluator[field={}]", O::NAME, self.field)
    }
}
