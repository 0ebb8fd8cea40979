//! Arithmetic operators.
//!
//! Integer overflow and division by zero are position-local failures, as is
//! any double operation that produces NaN or an infinity.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::PrimitiveValues;
use crate::error::{ColexecError, Result, ValueError};
use crate::evaluator::binary::binary_op;
use crate::evaluator::unary::unary_op;
use crate::evaluator::{BinaryFactory, BinaryOp, SharedFactory};
use crate::types::ElementType;

type Ints = PrimitiveValues<i32>;
type Longs = PrimitiveValues<i64>;
type Doubles = PrimitiveValues<f64>;

#[inline]
fn finite(value: f64) -> std::result::Result<f64, ValueError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValueError::NotFinite)
    }
}

macro_rules! integer_arithmetic {
    ($store:ty, $t:ty: $add:ident, $sub:ident, $mul:ident, $div:ident, $rem:ident) => {
        binary_op!($add($store, $store) -> $t, try |l, r| l.checked_add(r).ok_or(ValueError::Overflow));
        binary_op!($sub($store, $store) -> $t, try |l, r| l.checked_sub(r).ok_or(ValueError::Overflow));
        binary_op!($mul($store, $store) -> $t, try |l, r| l.checked_mul(r).ok_or(ValueError::Overflow));
        binary_op!($div($store, $store) -> $t, try |l, r| {
            if r == 0 {
                return Err(ValueError::DivisionByZero);
            }
            l.checked_div(r).ok_or(ValueError::Overflow)
        });
        // MIN % -1 is 0, not an overflow
        binary_op!($rem($store, $store) -> $t, try |l, r| {
            if r == 0 {
                return Err(ValueError::DivisionByZero);
            }
            Ok(l.wrapping_rem(r))
        });
    };
}

integer_arithmetic!(Ints, i32: AddInts, SubInts, MulInts, DivInts, ModInts);
integer_arithmetic!(Longs, i64: AddLongs, SubLongs, MulLongs, DivLongs, ModLongs);

binary_op!(AddDoubles(Doubles, Doubles) -> f64, try |l, r| finite(l + r));
binary_op!(SubDoubles(Doubles, Doubles) -> f64, try |l, r| finite(l - r));
binary_op!(MulDoubles(Doubles, Doubles) -> f64, try |l, r| finite(l * r));
binary_op!(DivDoubles(Doubles, Doubles) -> f64, try |l, r| {
    if r == 0.0 {
        return Err(ValueError::DivisionByZero);
    }
    finite(l / r)
});
binary_op!(ModDoubles(Doubles, Doubles) -> f64, try |l, r| {
    if r == 0.0 {
        return Err(ValueError::DivisionByZero);
    }
    finite(l % r)
});

unary_op!(NegInts(Ints) -> i32, try |v| v.checked_neg().ok_or(ValueError::Overflow));
unary_op!(NegLongs(Longs) -> i64, try |v| v.checked_neg().ok_or(ValueError::Overflow));
unary_op!(NegDoubles(Doubles) -> f64, |v| -v);

/// Arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithmeticOp {
    /// Returns the operator symbol.
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
            ArithmeticOp::Mod => "%",
        }
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn shared<O: BinaryOp>(lhs: SharedFactory, rhs: SharedFactory) -> SharedFactory {
    Arc::new(BinaryFactory::<O>::new(lhs, rhs))
}

/// Picks the arithmetic evaluator specialized for `element_type`.
///
/// # Errors
///
/// Returns `UnsupportedOperation` for non-numeric element types.
pub fn arithmetic_factory(
    op: ArithmeticOp,
    element_type: ElementType,
    lhs: SharedFactory,
    rhs: SharedFactory,
) -> Result<SharedFactory> {
    let factory = match (element_type, op) {
        (ElementType::Int, ArithmeticOp::Add) => shared::<AddInts>(lhs, rhs),
        (ElementType::Int, ArithmeticOp::Sub) => shared::<SubInts>(lhs, rhs),
        (ElementType::Int, ArithmeticOp::Mul) => shared::<MulInts>(lhs, rhs),
        (ElementType::Int, ArithmeticOp::Div) => shared::<DivInts>(lhs, rhs),
        (ElementType::Int, ArithmeticOp::Mod) => shared::<ModInts>(lhs, rhs),
        (ElementType::Long, ArithmeticOp::Add) => shared::<AddLongs>(lhs, rhs),
        (ElementType::Long, ArithmeticOp::Sub) => shared::<SubLongs>(lhs, rhs),
        (ElementType::Long, ArithmeticOp::Mul) => shared::<MulLongs>(lhs, rhs),
        (ElementType::Long, ArithmeticOp::Div) => shared::<DivLongs>(lhs, rhs),
        (ElementType::Long, ArithmeticOp::Mod) => shared::<ModLongs>(lhs, rhs),
        (ElementType::Double, ArithmeticOp::Add) => shared::<AddDoubles>(lhs, rhs),
        (ElementType::Double, ArithmeticOp::Sub) => shared::<SubDoubles>(lhs, rhs),
        (ElementType::Double, ArithmeticOp::Mul) => shared::<MulDoubles>(lhs, rhs),
        (ElementType::Double, ArithmeticOp::Div) => shared::<DivDoubles>(lhs, rhs),
        (ElementType::Double, ArithmeticOp::Mod) => shared::<ModDoubles>(lhs, rhs),
        (other, op) => {
            return Err(ColexecError::UnsupportedOperation(format!(
                "no [{op}] evaluator for {other}"
            )))
        }
    };
    Ok(factory)
}
