//! Element types, mapped data types and scalar values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Physical element type stored in a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    /// One bit per value.
    Boolean,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer. Also carries dates and geo points.
    Long,
    /// 64-bit floating point.
    Double,
    /// Variable-length byte sequence.
    BytesRef,
    /// Every position is null; no values are stored.
    Null,
}

impl ElementType {
    /// Returns the name of the element type.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Boolean => "BOOLEAN",
            ElementType::Int => "INT",
            ElementType::Long => "LONG",
            ElementType::Double => "DOUBLE",
            ElementType::BytesRef => "BYTES_REF",
            ElementType::Null => "NULL",
        }
    }

    /// Returns whether values of this type are numbers.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ElementType::Int | ElementType::Long | ElementType::Double
        )
    }

    /// Converts to the Arrow data type used when exporting a flat block.
    #[must_use]
    pub fn to_arrow(&self) -> arrow::datatypes::DataType {
        match self {
            ElementType::Boolean => arrow::datatypes::DataType::Boolean,
            ElementType::Int => arrow::datatypes::DataType::Int32,
            ElementType::Long => arrow::datatypes::DataType::Int64,
            ElementType::Double => arrow::datatypes::DataType::Float64,
            ElementType::BytesRef => arrow::datatypes::DataType::Binary,
            ElementType::Null => arrow::datatypes::DataType::Null,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Field type reported by the mapping subsystem for a column.
///
/// The engine never infers these; it only maps them onto element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Keyword,
    Text,
    Ip,
    Long,
    Integer,
    Short,
    Byte,
    Double,
    Float,
    HalfFloat,
    ScaledFloat,
    Boolean,
    /// Milliseconds since the epoch.
    Date,
    /// Latitude and longitude packed into one long.
    GeoPoint,
    Null,
}

impl DataType {
    /// Every mapped type, in declaration order.
    pub const ALL: [DataType; 15] = [
        DataType::Keyword,
        DataType::Text,
        DataType::Ip,
        DataType::Long,
        DataType::Integer,
        DataType::Short,
        DataType::Byte,
        DataType::Double,
        DataType::Float,
        DataType::HalfFloat,
        DataType::ScaledFloat,
        DataType::Boolean,
        DataType::Date,
        DataType::GeoPoint,
        DataType::Null,
    ];

    /// Returns the type name as the mapping subsystem spells it.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Keyword => "keyword",
            DataType::Text => "text",
            DataType::Ip => "ip",
            DataType::Long => "long",
            DataType::Integer => "integer",
            DataType::Short => "short",
            DataType::Byte => "byte",
            DataType::Double => "double",
            DataType::Float => "float",
            DataType::HalfFloat => "half_float",
            DataType::ScaledFloat => "scaled_float",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::GeoPoint => "geo_point",
            DataType::Null => "null",
        }
    }

    /// Looks up a type by its mapping name.
    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Returns the element type blocks of this field type are stored as.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        match self {
            DataType::Keyword | DataType::Text | DataType::Ip => ElementType::BytesRef,
            DataType::Long | DataType::Date | DataType::GeoPoint => ElementType::Long,
            DataType::Integer | DataType::Short | DataType::Byte => ElementType::Int,
            DataType::Double
            | DataType::Float
            | DataType::HalfFloat
            | DataType::ScaledFloat => ElementType::Double,
            DataType::Boolean => ElementType::Boolean,
            DataType::Null => ElementType::Null,
        }
    }

    /// Returns whether this type is numeric (dates and geo points are not).
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Long
                | DataType::Integer
                | DataType::Short
                | DataType::Byte
                | DataType::Double
                | DataType::Float
                | DataType::HalfFloat
                | DataType::ScaledFloat
        )
    }

    /// Returns whether this type holds byte-sequence text.
    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self, DataType::Keyword | DataType::Text)
    }

    /// Returns the numeric type both operands widen to, if any.
    ///
    /// Integers widen to longs, anything combined with a floating point
    /// type widens to double.
    #[must_use]
    pub fn widen(self, other: DataType) -> Option<DataType> {
        if !self.is_numeric() || !other.is_numeric() {
            return None;
        }
        let widest = match (self.element_type(), other.element_type()) {
            (ElementType::Double, _) | (_, ElementType::Double) => DataType::Double,
            (ElementType::Long, _) | (_, ElementType::Long) => DataType::Long,
            _ => DataType::Integer,
        };
        Some(widest)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scalar value container used for literals and for reading blocks back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    BytesRef(Vec<u8>),
}

impl Value {
    /// Creates a byte-sequence value from a string.
    #[must_use]
    pub fn keyword(s: &str) -> Self {
        Value::BytesRef(s.as_bytes().to_vec())
    }

    /// Returns the element type a block holding this value would have.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        match self {
            Value::Null => ElementType::Null,
            Value::Boolean(_) => ElementType::Boolean,
            Value::Int(_) => ElementType::Int,
            Value::Long(_) => ElementType::Long,
            Value::Double(_) => ElementType::Double,
            Value::BytesRef(_) => ElementType::BytesRef,
        }
    }

    /// Returns true if this is the null value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean payload, if any.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the long payload, if any.
    #[must_use]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the double payload, if any.
    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the bytes payload, if any.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::BytesRef(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::BytesRef(v) => write!(f, "{}", String::from_utf8_lossy(v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_names_round_trip() {
        for t in DataType::ALL {
            assert_eq!(DataType::from_type_name(t.name()), Some(t));
        }
        assert_eq!(DataType::from_type_name("nested"), None);
    }

    #[test]
    fn test_structured_types_stored_as_long() {
        assert_eq!(DataType::Date.element_type(), ElementType::Long);
        assert_eq!(DataType::GeoPoint.element_type(), ElementType::Long);
        assert!(!DataType::Date.is_numeric());
    }

    #[test]
    fn test_widen() {
        assert_eq!(DataType::Integer.widen(DataType::Short), Some(DataType::Integer));
        assert_eq!(DataType::Integer.widen(DataType::Long), Some(DataType::Long));
        assert_eq!(DataType::Long.widen(DataType::Float), Some(DataType::Double));
        assert_eq!(DataType::Long.widen(DataType::Keyword), None);
        assert_eq!(DataType::Date.widen(DataType::Long), None);
    }

    #[test]
    fn test_serde_uses_mapping_names() {
        let json = serde_json::to_string(&DataType::GeoPoint).unwrap();
        assert_eq!(json, "\"geo_point\"");
    }

    #[test]
    fn test_value_element_type() {
        assert_eq!(Value::keyword("x").element_type(), ElementType::BytesRef);
        assert_eq!(Value::Null.element_type(), ElementType::Null);
        assert_eq!(Value::Long(1).to_string(), "1");
    }
}
