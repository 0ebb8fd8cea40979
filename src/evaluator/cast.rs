//! Widening casts between numeric element types.

#![allow(clippy::cast_precision_loss)]

use crate::data::PrimitiveValues;
use crate::evaluator::unary::unary_op;

unary_op!(
    /// `int` to `long`.
    CastIntToLong(PrimitiveValues<i32>) -> i64, |v| i64::from(v)
);
unary_op!(
    /// `int` to `double`.
    CastIntToDouble(PrimitiveValues<i32>) -> f64, |v| f64::from(v)
);
unary_op!(
    /// `long` to `double`; magnitudes above 2^53 round to the nearest double.
    CastLongToDouble(PrimitiveValues<i64>) -> f64, |v| v as f64
);
