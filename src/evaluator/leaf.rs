//! Leaf evaluators: channel references and literals.

use std::fmt;

use tracing::trace;

use crate::data::{Block, Page};
use crate::error::{ColexecError, Result};
use crate::evaluator::{EvaluatorFactory, ExpressionEvaluator};
use crate::memory::DriverContext;
use crate::types::{ElementType, Value};

/// Reads one channel of the page.
///
/// The block is shared, not copied. A constant null block is accepted for
/// any declared element type.
#[derive(Debug, Clone, Copy)]
pub struct ChannelFactory {
    channel: usize,
    element_type: ElementType,
}

impl ChannelFactory {
    /// Creates a reference to `channel`, which must hold `element_type`.
    #[must_use]
    pub fn new(channel: usize, element_type: ElementType) -> Self {
        Self {
            channel,
            element_type,
        }
    }
}

impl EvaluatorFactory for ChannelFactory {
    fn get(&self, _ctx: &DriverContext) -> Box<dyn ExpressionEvaluator> {
        Box::new(ChannelEvaluator { factory: *self })
    }
}

impl fmt::Display for ChannelFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attribute[channel={}]", self.channel)
    }
}

struct ChannelEvaluator {
    factory: ChannelFactory,
}

impl ExpressionEvaluator for ChannelEvaluator {
    fn eval(&mut self, page: &Page) -> Result<Block> {
        let block = page.block(self.factory.channel)?;
        let actual = block.element_type();
        if actual != self.factory.element_type && actual != ElementType::Null {
            return Err(ColexecError::TypeMismatch {
                expected: self.factory.element_type,
                actual,
            });
        }
        Ok(block.clone())
    }
}

impl fmt::Display for ChannelEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.factory, f)
    }
}

/// A constant value repeated at every position.
#[derive(Debug, Clone)]
pub struct LiteralFactory {
    value: Value,
}

impl LiteralFactory {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// The literal value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl EvaluatorFactory for LiteralFactory {
    fn get(&self, ctx: &DriverContext) -> Box<dyn ExpressionEvaluator> {
        trace!(literal = %self.value, driver = %ctx.id(), "building literal evaluator");
        Box::new(LiteralEvaluator {
            value: self.value.clone(),
            ctx: ctx.clone(),
            cached: None,
        })
    }
}

impl fmt::Display for LiteralFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LiteralsEvaluator[lit={}]", self.value)
    }
}

/// Keeps the last block it built and hands out shared references to it
/// while pages keep the same position count.
struct LiteralEvaluator {
    value: Value,
    ctx: DriverContext,
    cached: Option<Block>,
}

impl ExpressionEvaluator for LiteralEvaluator {
    fn eval(&mut self, page: &Page) -> Result<Block> {
        let positions = page.position_count();
        if let Some(block) = self.cached.as_ref().filter(|b| b.position_count() == positions) {
            return Ok(block.clone());
        }
        // release the old block before allocating its replacement
        self.cached = None;
        let block = self
            .ctx
            .block_factory()
            .new_constant_block(&self.value, positions)?;
        self.cached = Some(block.clone());
        Ok(block)
    }
}

impl fmt::Display for LiteralEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LiteralsEvaluator[lit={}]", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;

    #[test]
    fn test_channel_shares_block() {
        let ctx = DriverContext::new(&DriverConfig::default());
        let block: Block = ctx
            .block_factory()
            .new_array_vector(vec![1_i64, 2])
            .unwrap()
            .into_block()
            .into();
        let page = Page::new(vec![block]).unwrap();
        let mut evaluator = ChannelFactory::new(0, ElementType::Long).get(&ctx);
        let result = evaluator.eval(&page).unwrap();
        assert_eq!(result.ref_count(), 2);
    }

    #[test]
    fn test_channel_type_checked() {
        let ctx = DriverContext::new(&DriverConfig::default());
        let block: Block = ctx
            .block_factory()
            .new_array_vector(vec![1_i64])
            .unwrap()
            .into_block()
            .into();
        let page = Page::new(vec![block]).unwrap();
        let mut evaluator = ChannelFactory::new(0, ElementType::Double).get(&ctx);
        assert!(matches!(
            evaluator.eval(&page),
            Err(ColexecError::TypeMismatch { .. })
        ));
        let mut evaluator = ChannelFactory::new(4, ElementType::Long).get(&ctx);
        assert!(matches!(
            evaluator.eval(&page),
            Err(ColexecError::ChannelOutOfRange { channel: 4, .. })
        ));
    }

    #[test]
    fn test_literal_is_cached_and_released_on_drop() {
        let ctx = DriverContext::new(&DriverConfig::default());
        let page = Page::with_position_count(3, vec![]).unwrap();
        let mut evaluator = LiteralFactory::new(Value::Long(7)).get(&ctx);
        let first = evaluator.eval(&page).unwrap();
        let second = evaluator.eval(&page).unwrap();
        assert_eq!(first.ref_count(), 3);
        assert_eq!(second.value(2), Value::Long(7));
        drop(first);
        drop(second);
        assert!(ctx.outstanding_bytes() > 0);
        drop(evaluator);
        assert_eq!(ctx.outstanding_bytes(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            LiteralFactory::new(Value::keyword("x")).to_string(),
            "LiteralsEvaluator[lit=x]"
        );
        assert_eq!(
            ChannelFactory::new(3, ElementType::Int).to_string(),
            "Attribute[channel=3]"
        );
    }
}
