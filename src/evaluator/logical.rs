//! Boolean negation.

use crate::data::PrimitiveValues;
use crate::evaluator::unary::unary_op;

unary_op!(
    /// Logical `NOT`; null stays null.
    Not(PrimitiveValues<bool>) -> bool, |v| !v
);
