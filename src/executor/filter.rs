//! Filter operator.

use crate::data::{Block, Page};
use crate::error::Result;
use crate::evaluator::ExpressionEvaluator;
use crate::executor::Operator;
use crate::memory::DriverContext;
use crate::types::ElementType;

/// Keeps the positions where the predicate is `true`.
///
/// Null and multi-valued predicate positions are dropped. Pages left empty
/// are skipped; pages where every position passes are forwarded unchanged.
pub struct FilterOperator {
    child: Box<dyn Operator>,
    predicate: Box<dyn ExpressionEvaluator>,
    ctx: DriverContext,
}

impl FilterOperator {
    /// Creates a new filter operator with the given child and bound predicate.
    #[must_use]
    pub fn new(
        child: Box<dyn Operator>,
        predicate: Box<dyn ExpressionEvaluator>,
        ctx: &DriverContext,
    ) -> Self {
        FilterOperator {
            child,
            predicate,
            ctx: ctx.clone(),
        }
    }
}

/// Positions where `mask` holds a single `true`.
fn selected_positions(mask: &Block) -> Result<Vec<usize>> {
    if mask.element_type() == ElementType::Null {
        return Ok(Vec::new());
    }
    let mask = mask.as_boolean_block()?;
    if let Some(vector) = mask.as_vector() {
        return Ok((0..vector.position_count()).filter(|&p| vector.get(p)).collect());
    }
    Ok((0..mask.position_count())
        .filter(|&p| {
            !mask.is_null(p) && mask.value_count(p) == 1 && mask.get(mask.first_value_index(p))
        })
        .collect())
}

impl Operator for FilterOperator {
    fn next_page(&mut self) -> Result<Option<Page>> {
        while let Some(page) = self.child.next_page()? {
            let positions = {
                let mask = self.predicate.eval(&page)?;
                selected_positions(&mask)?
            };
            if positions.is_empty() {
                continue;
            }
            if positions.len() == page.position_count() {
                return Ok(Some(page));
            }
            return page.filter(self.ctx.block_factory(), &positions).map(Some);
        }
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "FilterOperator"
    }
}
