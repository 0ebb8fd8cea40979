//! Comparison operators.
//!
//! Keywords compare as unsigned byte sequences. Doubles follow IEEE 754, so
//! NaN is unequal to everything including itself.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::{BytesRefValues, PrimitiveValues};
use crate::error::{ColexecError, Result};
use crate::evaluator::binary::binary_op;
use crate::evaluator::{BinaryFactory, SharedFactory};
use crate::types::ElementType;

type Booleans = PrimitiveValues<bool>;
type Ints = PrimitiveValues<i32>;
type Longs = PrimitiveValues<i64>;
type Doubles = PrimitiveValues<f64>;
type Keywords = BytesRefValues;

macro_rules! comparisons {
    ($store:ty: $eq:ident, $neq:ident, $gt:ident, $gte:ident, $lt:ident, $lte:ident) => {
        binary_op!($eq($store, $store) -> bool, |l, r| l == r);
        binary_op!($neq($store, $store) -> bool, |l, r| l != r);
        binary_op!($gt($store, $store) -> bool, |l, r| l > r);
        binary_op!($gte($store, $store) -> bool, |l, r| l >= r);
        binary_op!($lt($store, $store) -> bool, |l, r| l < r);
        binary_op!($lte($store, $store) -> bool, |l, r| l <= r);
    };
}

comparisons!(Ints: EqualsInts, NotEqualsInts, GreaterThanInts, GreaterThanOrEqualInts, LessThanInts, LessThanOrEqualInts);
comparisons!(Longs: EqualsLongs, NotEqualsLongs, GreaterThanLongs, GreaterThanOrEqualLongs, LessThanLongs, LessThanOrEqualLongs);
comparisons!(Doubles: EqualsDoubles, NotEqualsDoubles, GreaterThanDoubles, GreaterThanOrEqualDoubles, LessThanDoubles, LessThanOrEqualDoubles);
comparisons!(Keywords: EqualsKeywords, NotEqualsKeywords, GreaterThanKeywords, GreaterThanOrEqualKeywords, LessThanKeywords, LessThanOrEqualKeywords);

binary_op!(EqualsBooleans(Booleans, Booleans) -> bool, |l, r| l == r);
binary_op!(NotEqualsBooleans(Booleans, Booleans) -> bool, |l, r| l != r);

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl ComparisonOp {
    /// Returns the operator symbol.
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "==",
            ComparisonOp::Neq => "!=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Gte => ">=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Lte => "<=",
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn shared<O: crate::evaluator::BinaryOp>(lhs: SharedFactory, rhs: SharedFactory) -> SharedFactory {
    Arc::new(BinaryFactory::<O>::new(lhs, rhs))
}

macro_rules! select {
    ($op:expr, $lhs:expr, $rhs:expr; $eq:ident, $neq:ident, $gt:ident, $gte:ident, $lt:ident, $lte:ident) => {
        match $op {
            ComparisonOp::Eq => shared::<$eq>($lhs, $rhs),
            ComparisonOp::Neq => shared::<$neq>($lhs, $rhs),
            ComparisonOp::Gt => shared::<$gt>($lhs, $rhs),
            ComparisonOp::Gte => shared::<$gte>($lhs, $rhs),
            ComparisonOp::Lt => shared::<$lt>($lhs, $rhs),
            ComparisonOp::Lte => shared::<$lte>($lhs, $rhs),
        }
    };
}

/// Picks the comparison evaluator specialized for `element_type`.
///
/// Both operands must already produce `element_type`; mixed numeric
/// operands are cast by the caller.
///
/// # Errors
///
/// Returns `UnsupportedOperation` when no specialization exists, e.g.
/// ordering booleans.
pub fn comparison_factory(
    op: ComparisonOp,
    element_type: ElementType,
    lhs: SharedFactory,
    rhs: SharedFactory,
) -> Result<SharedFactory> {
    let factory = match element_type {
        ElementType::Int => select!(op, lhs, rhs; EqualsInts, NotEqualsInts, GreaterThanInts, GreaterThanOrEqualInts, LessThanInts, LessThanOrEqualInts),
        ElementType::Long => select!(op, lhs, rhs; EqualsLongs, NotEqualsLongs, GreaterThanLongs, GreaterThanOrEqualLongs, LessThanLongs, LessThanOrEqualLongs),
        ElementType::Double => select!(op, lhs, rhs; EqualsDoubles, NotEqualsDoubles, GreaterThanDoubles, GreaterThanOrEqualDoubles, LessThanDoubles, LessThanOrEqualDoubles),
        ElementType::BytesRef => select!(op, lhs, rhs; EqualsKeywords, NotEqualsKeywords, GreaterThanKeywords, GreaterThanOrEqualKeywords, LessThanKeywords, LessThanOrEqualKeywords),
        ElementType::Boolean if op == ComparisonOp::Eq => shared::<EqualsBooleans>(lhs, rhs),
        ElementType::Boolean if op == ComparisonOp::Neq => shared::<NotEqualsBooleans>(lhs, rhs),
        other => {
            return Err(ColexecError::UnsupportedOperation(format!(
                "no [{op}] evaluator for {other}"
            )))
        }
    };
    Ok(factory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::BinaryOp;
    use crate::types::Value;

    #[test]
    fn test_keywords_compare_bytewise() {
        assert_eq!(LessThanKeywords::process(b"abc", b"abd"), Ok(true));
        assert_eq!(GreaterThanKeywords::process(b"b", b"abc"), Ok(true));
        assert_eq!(EqualsKeywords::process(b"", b""), Ok(true));
        // 0xC3 sorts after ASCII
        assert_eq!(GreaterThanKeywords::process("é".as_bytes(), b"z"), Ok(true));
    }

    #[test]
    fn test_nan_is_unequal() {
        assert_eq!(EqualsDoubles::process(f64::NAN, f64::NAN), Ok(false));
        assert_eq!(NotEqualsDoubles::process(f64::NAN, 1.0), Ok(true));
    }

    #[test]
    fn test_boolean_ordering_is_unsupported() {
        let lhs: SharedFactory =
            Arc::new(crate::evaluator::LiteralFactory::new(Value::Boolean(true)));
        let rhs = Arc::clone(&lhs);
        assert!(
            comparison_factory(ComparisonOp::Gt, ElementType::Boolean, lhs.clone(), rhs.clone())
                .is_err()
        );
        assert!(comparison_factory(ComparisonOp::Eq, ElementType::Boolean, lhs, rhs).is_ok());
    }

    #[test]
    fn test_names() {
        assert_eq!(EqualsKeywords::NAME, "EqualsKeywords");
        assert_eq!(GreaterThanOrEqualLongs::NAME, "GreaterThanOrEqualLongs");
    }
}
