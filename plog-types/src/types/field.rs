use std::fmt::{Display, Formatter};

use bigdecimal::BigDecimal;
use chrono::{DateTime, SecondsFormat, Utc};
use ordered_float::OrderedFloat;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A decoded column value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    /// Numbers whose declared precision fits a machine integer.
    Int(i32),
    Long(i64),
    Decimal(Decimal),
    /// NUMBER values beyond the 28 digits a `Decimal` holds.
    BigDecimal(BigDecimal),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    String(String),
    Binary(Vec<u8>),
    Timestamp(DateTime<Utc>),
    /// Signed interval, `+DD HH:MM:SS.FFFFFFFFF` or `+YY-MM`.
    Interval(String),
    Null,
}

impl Field {
    pub fn get_type(&self) -> FieldType {
        match self {
            Field::Int(_) => FieldType::Int,
            Field::Long(_) => FieldType::Long,
            Field::Decimal(_) => FieldType::Decimal,
            Field::BigDecimal(_) => FieldType::BigDecimal,
            Field::Float(_) => FieldType::Float,
            Field::Double(_) => FieldType::Double,
            Field::String(_) => FieldType::String,
            Field::Binary(_) => FieldType::Binary,
            Field::Timestamp(_) => FieldType::Timestamp,
            Field::Interval(_) => FieldType::Interval,
            Field::Null => FieldType::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Int(value) => write!(f, "{value}"),
            Field::Long(value) => write!(f, "{value}"),
            Field::Decimal(value) => write!(f, "{value}"),
            Field::BigDecimal(value) => write!(f, "{value}"),
            Field::Float(value) => write!(f, "{value}"),
            Field::Double(value) => write!(f, "{value}"),
            Field::String(value) => f.write_str(value),
            Field::Binary(value) => f.write_str(&hex::encode_upper(value)),
            Field::Timestamp(value) => {
                f.write_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Field::Interval(value) => f.write_str(value),
            Field::Null => f.write_str("NULL"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Int,
    Long,
    Decimal,
    BigDecimal,
    Float,
    Double,
    String,
    Binary,
    Timestamp,
    Interval,
    Null,
}
