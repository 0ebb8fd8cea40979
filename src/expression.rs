//! Typed expression trees and their mapping onto evaluator factories.
//!
//! An [`Expression`] carries the data types reported by the mapping layer.
//! [`Expression::to_factory`] picks the evaluator specialized for those types
//! once, inserting widening casts where numeric operands differ, so nothing
//! is re-checked per value at run time.

use std::sync::Arc;

use tracing::trace;

use crate::error::{ColexecError, Result};
use crate::evaluator::{
    arithmetic_factory, comparison_factory, ArithmeticOp, CastIntToDouble, CastIntToLong,
    CastLongToDouble, ChannelFactory, ComparisonOp, LiteralFactory, NegDoubles, NegInts,
    NegLongs, Not, SharedFactory, ToBooleanFromString, ToDatetimeFromString, ToDoubleFromString,
    ToGeoPointFromString, ToIntegerFromString, ToLongFromString, UnaryFactory, UnaryOp,
};
use crate::types::{DataType, ElementType, Value};

/// A typed expression over the channels of a page.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Reads the block at `channel`.
    Column { channel: usize, data_type: DataType },

    /// A constant.
    Literal { value: Value, data_type: DataType },

    /// Binary comparison; always boolean.
    Comparison {
        left: Box<Expression>,
        op: ComparisonOp,
        right: Box<Expression>,
    },

    /// Binary arithmetic over numeric operands.
    Arithmetic {
        left: Box<Expression>,
        op: ArithmeticOp,
        right: Box<Expression>,
    },

    /// Logical negation.
    Not(Box<Expression>),

    /// Numeric negation.
    Neg(Box<Expression>),

    /// Type conversion (`TO_LONG`, `TO_DATETIME`, ...).
    Convert {
        operand: Box<Expression>,
        target: DataType,
    },
}

impl Expression {
    /// Creates a column reference.
    #[must_use]
    pub fn column(channel: usize, data_type: DataType) -> Self {
        Expression::Column { channel, data_type }
    }

    /// Creates a literal, typed after its value (bytes are keywords).
    #[must_use]
    pub fn literal(value: Value) -> Self {
        let data_type = match value {
            Value::Null => DataType::Null,
            Value::Boolean(_) => DataType::Boolean,
            Value::Int(_) => DataType::Integer,
            Value::Long(_) => DataType::Long,
            Value::Double(_) => DataType::Double,
            Value::BytesRef(_) => DataType::Keyword,
        };
        Expression::Literal { value, data_type }
    }

    /// Creates a literal with an explicit type, e.g. a date stored as a long.
    #[must_use]
    pub fn typed_literal(value: Value, data_type: DataType) -> Self {
        Expression::Literal { value, data_type }
    }

    /// Creates a comparison.
    #[must_use]
    pub fn comparison(left: Expression, op: ComparisonOp, right: Expression) -> Self {
        Expression::Comparison {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Creates an arithmetic expression.
    #[must_use]
    pub fn arithmetic(left: Expression, op: ArithmeticOp, right: Expression) -> Self {
        Expression::Arithmetic {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Creates a logical negation.
    #[must_use]
    pub fn not(operand: Expression) -> Self {
        Expression::Not(Box::new(operand))
    }

    /// Creates a numeric negation.
    #[must_use]
    pub fn neg(operand: Expression) -> Self {
        Expression::Neg(Box::new(operand))
    }

    /// Creates a conversion to `target`.
    #[must_use]
    pub fn convert(operand: Expression, target: DataType) -> Self {
        Expression::Convert {
            operand: Box::new(operand),
            target,
        }
    }

    /// Returns the data type this expression produces.
    ///
    /// Arithmetic yields the widened operand type. Type errors are reported
    /// by [`to_factory`](Self::to_factory), not here.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Expression::Column { data_type, .. } | Expression::Literal { data_type, .. } => {
                *data_type
            }
            Expression::Comparison { .. } | Expression::Not(_) => DataType::Boolean,
            Expression::Arithmetic { left, right, .. } => {
                let (l, r) = (left.data_type(), right.data_type());
                if l == DataType::Null || r == DataType::Null {
                    DataType::Null
                } else {
                    l.widen(r).unwrap_or(l)
                }
            }
            Expression::Neg(operand) => operand.data_type(),
            Expression::Convert { target, .. } => *target,
        }
    }

    /// Builds the factory tree for this expression.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` when no evaluator exists for the
    /// operand types, and `InvalidArgument` for a literal whose value does
    /// not match its declared type.
    pub fn to_factory(&self) -> Result<SharedFactory> {
        match self {
            Expression::Column { channel, data_type } => Ok(Arc::new(ChannelFactory::new(
                *channel,
                data_type.element_type(),
            ))),
            Expression::Literal { value, data_type } => {
                if !value.is_null() && value.element_type() != data_type.element_type() {
                    return Err(ColexecError::InvalidArgument(format!(
                        "literal [{value}] is not a {data_type}"
                    )));
                }
                Ok(Arc::new(LiteralFactory::new(value.clone())))
            }
            Expression::Comparison { left, op, right } => {
                let (l, r) = (left.data_type(), right.data_type());
                if l == DataType::Null || r == DataType::Null {
                    return Ok(null_factory());
                }
                let common = comparable_type(l, r, *op).ok_or_else(|| {
                    ColexecError::UnsupportedOperation(format!("cannot compare {l} {op} {r}"))
                })?;
                let lhs = cast(left.to_factory()?, l, common)?;
                let rhs = cast(right.to_factory()?, r, common)?;
                trace!(%op, data_type = %common, "mapping comparison");
                comparison_factory(*op, common.element_type(), lhs, rhs)
            }
            Expression::Arithmetic { left, op, right } => {
                let (l, r) = (left.data_type(), right.data_type());
                if l == DataType::Null || r == DataType::Null {
                    return Ok(null_factory());
                }
                let common = l.widen(r).ok_or_else(|| {
                    ColexecError::UnsupportedOperation(format!(
                        "arithmetic [{op}] needs numeric operands, got {l} and {r}"
                    ))
                })?;
                let lhs = cast(left.to_factory()?, l, common)?;
                let rhs = cast(right.to_factory()?, r, common)?;
                trace!(%op, data_type = %common, "mapping arithmetic");
                arithmetic_factory(*op, common.element_type(), lhs, rhs)
            }
            Expression::Not(operand) => match operand.data_type() {
                DataType::Null => Ok(null_factory()),
                DataType::Boolean => Ok(unary::<Not>(operand.to_factory()?)),
                other => Err(ColexecError::UnsupportedOperation(format!(
                    "NOT needs a boolean operand, got {other}"
                ))),
            },
            Expression::Neg(operand) => {
                let data_type = operand.data_type();
                match (data_type, data_type.element_type()) {
                    (DataType::Null, _) => Ok(null_factory()),
                    (t, ElementType::Int) if t.is_numeric() => {
                        Ok(unary::<NegInts>(operand.to_factory()?))
                    }
                    (t, ElementType::Long) if t.is_numeric() => {
                        Ok(unary::<NegLongs>(operand.to_factory()?))
                    }
                    (t, ElementType::Double) if t.is_numeric() => {
                        Ok(unary::<NegDoubles>(operand.to_factory()?))
                    }
                    (other, _) => Err(ColexecError::UnsupportedOperation(format!(
                        "cannot negate {other}"
                    ))),
                }
            }
            Expression::Convert { operand, target } => {
                convert(operand.to_factory()?, operand.data_type(), *target)
            }
        }
    }
}

fn null_factory() -> SharedFactory {
    Arc::new(LiteralFactory::new(Value::Null))
}

fn unary<O: UnaryOp>(field: SharedFactory) -> SharedFactory {
    Arc::new(UnaryFactory::<O>::new(field))
}

/// The type both sides of a comparison are evaluated in.
///
/// Packed geo points have no order, only equality.
fn comparable_type(l: DataType, r: DataType, op: ComparisonOp) -> Option<DataType> {
    if l.is_numeric() && r.is_numeric() {
        return l.widen(r);
    }
    if l == DataType::GeoPoint && !matches!(op, ComparisonOp::Eq | ComparisonOp::Neq) {
        return None;
    }
    if l == r || (l.is_string() && r.is_string()) {
        return Some(l);
    }
    None
}

/// Wraps `factory` in the widening cast from `from` to `to`, if one is needed.
fn cast(factory: SharedFactory, from: DataType, to: DataType) -> Result<SharedFactory> {
    match (from.element_type(), to.element_type()) {
        (a, b) if a == b => Ok(factory),
        (ElementType::Int, ElementType::Long) => Ok(unary::<CastIntToLong>(factory)),
        (ElementType::Int, ElementType::Double) => Ok(unary::<CastIntToDouble>(factory)),
        (ElementType::Long, ElementType::Double) => Ok(unary::<CastLongToDouble>(factory)),
        _ => Err(ColexecError::UnsupportedOperation(format!(
            "cannot cast {from} to {to}"
        ))),
    }
}

fn convert(factory: SharedFactory, from: DataType, to: DataType) -> Result<SharedFactory> {
    if from == DataType::Null {
        return Ok(null_factory());
    }
    if from == to || (from.is_string() && to.is_string()) {
        return Ok(factory);
    }
    if from.is_string() {
        return match to {
            DataType::Long => Ok(unary::<ToLongFromString>(factory)),
            DataType::Integer => Ok(unary::<ToIntegerFromString>(factory)),
            DataType::Double => Ok(unary::<ToDoubleFromString>(factory)),
            DataType::Boolean => Ok(unary::<ToBooleanFromString>(factory)),
            DataType::Date => Ok(unary::<ToDatetimeFromString>(factory)),
            DataType::GeoPoint => Ok(unary::<ToGeoPointFromString>(factory)),
            other => Err(ColexecError::UnsupportedOperation(format!(
                "cannot convert {from} to {other}"
            ))),
        };
    }
    if from.is_numeric() && to.is_numeric() {
        return cast(factory, from, to);
    }
    Err(ColexecError::UnsupportedOperation(format!(
        "cannot convert {from} to {to}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_types() {
        let int = Expression::column(0, DataType::Integer);
        let long = Expression::column(1, DataType::Long);
        let sum = Expression::arithmetic(int.clone(), ArithmeticOp::Add, long);
        assert_eq!(sum.data_type(), DataType::Long);
        let cmp = Expression::comparison(int, ComparisonOp::Lt, Expression::literal(Value::Double(1.5)));
        assert_eq!(cmp.data_type(), DataType::Boolean);
    }

    #[test]
    fn test_mixed_numeric_comparison_inserts_cast() {
        let expr = Expression::comparison(
            Expression::column(0, DataType::Integer),
            ComparisonOp::Eq,
            Expression::literal(Value::Double(1.0)),
        );
        let factory = expr.to_factory().unwrap();
        assert_eq!(
            factory.to_string(),
            "EqualsDoublesEvaluator[lhs=CastIntToDoubleEvaluator[field=Attribute[channel=0]], \
             rhs=LiteralsEvaluator[lit=1]]"
        );
    }

    #[test]
    fn test_keyword_and_text_compare() {
        let expr = Expression::comparison(
            Expression::column(0, DataType::Keyword),
            ComparisonOp::Eq,
            Expression::column(1, DataType::Text),
        );
        assert!(expr.to_factory().unwrap().to_string().starts_with("EqualsKeywords"));
    }

    #[test]
    fn test_incompatible_types_rejected() {
        let expr = Expression::comparison(
            Expression::column(0, DataType::Keyword),
            ComparisonOp::Eq,
            Expression::column(1, DataType::Long),
        );
        assert!(matches!(
            expr.to_factory(),
            Err(ColexecError::UnsupportedOperation(_))
        ));
        let expr = Expression::arithmetic(
            Expression::column(0, DataType::Date),
            ArithmeticOp::Add,
            Expression::column(1, DataType::Long),
        );
        assert!(expr.to_factory().is_err());
        assert!(Expression::not(Expression::column(0, DataType::Long))
            .to_factory()
            .is_err());
    }

    #[test]
    fn test_geo_points_compare_only_for_equality() {
        let compare = |op| {
            Expression::comparison(
                Expression::column(0, DataType::GeoPoint),
                op,
                Expression::column(1, DataType::GeoPoint),
            )
            .to_factory()
        };
        assert!(compare(ComparisonOp::Eq).is_ok());
        assert!(compare(ComparisonOp::Neq).is_ok());
        for op in [ComparisonOp::Lt, ComparisonOp::Lte, ComparisonOp::Gt, ComparisonOp::Gte] {
            assert!(matches!(
                compare(op),
                Err(ColexecError::UnsupportedOperation(_))
            ));
        }
    }

    #[test]
    fn test_null_operand_folds_to_null_literal() {
        let expr = Expression::arithmetic(
            Expression::column(0, DataType::Long),
            ArithmeticOp::Add,
            Expression::literal(Value::Null),
        );
        assert_eq!(expr.data_type(), DataType::Null);
        assert_eq!(expr.to_factory().unwrap().to_string(), "LiteralsEvaluator[lit=null]");
    }

    #[test]
    fn test_literal_type_checked() {
        let bad = Expression::typed_literal(Value::keyword("x"), DataType::Date);
        assert!(matches!(bad.to_factory(), Err(ColexecError::InvalidArgument(_))));
        let date = Expression::typed_literal(Value::Long(0), DataType::Date);
        assert!(date.to_factory().is_ok());
    }

    #[test]
    fn test_convert_selection() {
        let keyword = Expression::column(0, DataType::Keyword);
        let to_date = Expression::convert(keyword.clone(), DataType::Date);
        assert_eq!(to_date.data_type(), DataType::Date);
        assert_eq!(
            to_date.to_factory().unwrap().to_string(),
            "ToDatetimeFromStringEvaluator[field=Attribute[channel=0]]"
        );
        assert!(Expression::convert(keyword, DataType::Ip).to_factory().is_err());
        let widen = Expression::convert(Expression::column(0, DataType::Short), DataType::Long);
        assert!(widen.to_factory().unwrap().to_string().starts_with("CastIntToLong"));
    }
}
