//! Eval operator: appends one computed block per page.

use crate::data::Page;
use crate::error::Result;
use crate::evaluator::ExpressionEvaluator;
use crate::executor::Operator;

/// Evaluates an expression over each page and appends the result as a new
/// last channel.
pub struct EvalOperator {
    child: Box<dyn Operator>,
    evaluator: Box<dyn ExpressionEvaluator>,
}

impl EvalOperator {
    /// Creates a new eval operator with the given child and bound evaluator.
    #[must_use]
    pub fn new(child: Box<dyn Operator>, evaluator: Box<dyn ExpressionEvaluator>) -> Self {
        EvalOperator { child, evaluator }
    }
}

impl Operator for EvalOperator {
    fn next_page(&mut self) -> Result<Option<Page>> {
        let Some(page) = self.child.next_page()? else {
            return Ok(None);
        };
        let block = self.evaluator.eval(&page)?;
        page.append_block(block).map(Some)
    }

    fn name(&self) -> &'static str {
        "EvalOperator"
    }
}
