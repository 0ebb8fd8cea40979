//! Conversions from keyword values to typed values.
//!
//! Every conversion that can reject its input is fallible: a malformed
//! keyword is a position-local failure handled by the value-error policy.

use std::str;

use crate::data::BytesRefValues;
use crate::error::ValueError;
use crate::evaluator::unary::unary_op;
use crate::types::{date, geo};

const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

fn utf8<'a>(raw: &'a [u8], target: &'static str) -> Result<&'a str, ValueError> {
    str::from_utf8(raw).map_err(|_| ValueError::malformed(target, raw))
}

/// Parses an integral number. Decimal input is accepted and truncated
/// toward zero, as long as it fits.
fn parse_long(raw: &[u8], target: &'static str) -> Result<i64, ValueError> {
    let text = utf8(raw, target)?;
    if let Ok(value) = text.parse::<i64>() {
        return Ok(value);
    }
    let value = parse_double(raw, target)?;
    if !(-TWO_POW_63..TWO_POW_63).contains(&value) {
        return Err(ValueError::Overflow);
    }
    Ok(value.trunc() as i64)
}

fn parse_double(raw: &[u8], target: &'static str) -> Result<f64, ValueError> {
    let value: f64 = utf8(raw, target)?
        .parse()
        .map_err(|_| ValueError::malformed(target, raw))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValueError::malformed(target, raw))
    }
}

unary_op!(
    /// Keyword to `long`.
    ToLongFromString(BytesRefValues) -> i64, try |v| parse_long(v, "long")
);
unary_op!(
    /// Keyword to `integer`; values outside the 32-bit range overflow.
    ToIntegerFromString(BytesRefValues) -> i32, try |v| {
        let value = parse_long(v, "integer")?;
        i32::try_from(value).map_err(|_| ValueError::Overflow)
    }
);
unary_op!(
    /// Keyword to `double`. NaN and infinities are rejected.
    ToDoubleFromString(BytesRefValues) -> f64, try |v| parse_double(v, "double")
);
unary_op!(
    /// Keyword to `boolean`: `true` in any case is true, anything else false.
    ToBooleanFromString(BytesRefValues) -> bool, |v| v.eq_ignore_ascii_case(b"true")
);
unary_op!(
    /// Keyword in ISO-8601 form to epoch milliseconds.
    ToDatetimeFromString(BytesRefValues) -> i64, try |v| date::parse_date_millis(v)
);
unary_op!(
    /// WKT `POINT (lon lat)` to the packed geo point encoding.
    ToGeoPointFromString(BytesRefValues) -> i64, try |v| geo::parse_wkt_point(v)
);
