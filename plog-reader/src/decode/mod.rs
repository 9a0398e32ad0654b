use plog_types::{
    thiserror,
    types::{Column, ColumnDataType, Field},
};
use regex::Regex;

use crate::errors::{Error, Result};

mod number;
mod temporal;
mod text;

pub use number::{decode_number, OracleNumber};

/// Declared NUMBER precisions up to this many digits decode as `Field::Int`.
pub const INT_DIGITS: i32 = 9;
/// Declared NUMBER precisions up to this many digits decode as `Field::Long`.
pub const LONG_DIGITS: i32 = 18;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: &'static str, actual: usize },
    #[error("empty value")]
    Empty,
    #[error("invalid base-100 digit {0:#04x}")]
    Digit(u8),
    #[error("value out of range")]
    Overflow,
    #[error("{0} is not an integer")]
    NotInteger(String),
    #[error("invalid date or time")]
    DateTime,
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("invalid UTF-16: {0}")]
    Utf16(#[from] std::char::DecodeUtf16Error),
}

/// Decodes one column image according to the column's dictionary type.
pub fn decode_value(column: &Column, bytes: &[u8]) -> Result<Field> {
    let invalid = |source: DecodeError| Error::InvalidValue {
        column: column.name.clone(),
        data_type: column.type_spec(),
        source,
    };

    match &column.data_type {
        ColumnDataType::Number => {
            let value = decode_number(bytes).map_err(invalid)?;
            number_field(column, value).map_err(invalid)
        }
        ColumnDataType::Float => decode_number(bytes)
            .and_then(OracleNumber::into_field)
            .map_err(invalid),
        ColumnDataType::BinaryFloat => number::decode_binary_float(bytes).map_err(invalid),
        ColumnDataType::BinaryDouble => number::decode_binary_double(bytes).map_err(invalid),
        ColumnDataType::Char | ColumnDataType::Varchar | ColumnDataType::Clob => {
            text::decode_utf8(bytes).map_err(invalid)
        }
        ColumnDataType::NChar | ColumnDataType::NVarchar | ColumnDataType::NClob => {
            text::decode_utf16(bytes).map_err(invalid)
        }
        ColumnDataType::Raw | ColumnDataType::LongRaw | ColumnDataType::Blob => {
            Ok(Field::Binary(bytes.to_vec()))
        }
        ColumnDataType::Date => temporal::decode_date(bytes).map_err(invalid),
        ColumnDataType::Timestamp | ColumnDataType::TimestampLtz => {
            temporal::decode_timestamp(bytes).map_err(invalid)
        }
        ColumnDataType::TimestampTz => temporal::decode_timestamp_tz(bytes).map_err(invalid),
        ColumnDataType::IntervalDs => temporal::decode_interval_ds(bytes).map_err(invalid),
        ColumnDataType::IntervalYm => temporal::decode_interval_ym(bytes).map_err(invalid),
        ColumnDataType::Unknown => Err(Error::UndescribedColumn(column.id)),
        ColumnDataType::Unsupported(name) => Err(Error::UnsupportedType {
            column: column.name.clone(),
            data_type: name.clone(),
        }),
    }
}

/// Picks the narrowest field type the declared precision allows.
fn number_field(
    column: &Column,
    value: OracleNumber,
) -> std::result::Result<Field, DecodeError> {
    if column.scale > 0 || column.precision <= 0 || column.precision > LONG_DIGITS {
        return value.into_field();
    }
    if !value.is_integer() {
        return Err(DecodeError::NotInteger(value.to_string()));
    }
    let long = value.to_i64().ok_or(DecodeError::Overflow)?;
    if column.precision <= INT_DIGITS {
        i32::try_from(long)
            .map(Field::Int)
            .map_err(|_| DecodeError::Overflow)
    } else {
        Ok(Field::Long(long))
    }
}

/// A column type spec such as `NUMBER(10,2)` or `TIMESTAMP(6) WITH TIME ZONE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub data_type: ColumnDataType,
    pub precision: i32,
    pub scale: i32,
}

impl TypeSpec {
    pub fn column(&self, id: u32, name: impl Into<String>) -> Column {
        let mut column = Column::new(id, name, self.data_type.clone());
        column.precision = self.precision;
        column.scale = self.scale;
        column
    }
}

#[derive(Debug, Clone)]
pub struct TypeSpecParser {
    size_regex: Regex,
}

impl Default for TypeSpecParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeSpecParser {
    pub fn new() -> Self {
        Self {
            size_regex: Regex::new(r"(?i)\(\s*(\d+)\s*(?:BYTE|CHAR)?\s*(?:,\s*(-?\d+)\s*)?\)")
                .unwrap(),
        }
    }

    /// The first parenthesized size gives precision and scale, the rest is the base type name.
    pub fn parse(&self, spec: &str) -> TypeSpec {
        let (precision, scale) = self
            .size_regex
            .captures(spec)
            .map(|captures| {
                let number = |i| {
                    captures
                        .get(i)
                        .and_then(|m| m.as_str().parse().ok())
                        .unwrap_or(0)
                };
                (number(1), number(2))
            })
            .unwrap_or((0, 0));
        let name = self.size_regex.replace_all(spec, " ");
        let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
        TypeSpec {
            data_type: ColumnDataType::from_name(&name),
            precision,
            scale,
        }
    }
}
