use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use byteorder::{BigEndian, ByteOrder};
use plog_types::{
    bigdecimal::BigDecimal,
    ordered_float::OrderedFloat,
    rust_decimal::Decimal,
    types::Field,
};

use super::DecodeError;

const ZERO: u8 = 0x80;
const POSITIVE_EXPONENT_BIAS: i32 = 0xC1;
const NEGATIVE_EXPONENT_BIAS: i32 = 0x3E;
const NEGATIVE_TERMINATOR: u8 = 102;
const MAX_DECIMAL_SCALE: i64 = 28;

/// An exact NUMBER value, `digits * 10^-scale`, without leading or trailing zero digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleNumber {
    negative: bool,
    digits: String,
    scale: i64,
}

impl OracleNumber {
    fn zero() -> Self {
        Self {
            negative: false,
            digits: "0".to_string(),
            scale: 0,
        }
    }

    pub fn is_integer(&self) -> bool {
        self.scale <= 0
    }

    fn sign(&self) -> &'static str {
        if self.negative {
            "-"
        } else {
            ""
        }
    }

    fn integer_digits(&self) -> Option<String> {
        if !self.is_integer() {
            return None;
        }
        Some(format!("{}{}", self.digits, "0".repeat((-self.scale) as usize)))
    }

    pub fn to_i64(&self) -> Option<i64> {
        let digits = self.integer_digits()?;
        format!("{}{}", self.sign(), digits).parse().ok()
    }

    /// The value as a `Decimal`, if it fits one without rounding.
    pub fn to_decimal(&self) -> Option<Decimal> {
        if self.scale > MAX_DECIMAL_SCALE {
            return None;
        }
        let (digits, scale) = match self.integer_digits() {
            Some(digits) => (digits, 0),
            None => (self.digits.clone(), self.scale as u32),
        };
        let mantissa: i128 = format!("{}{}", self.sign(), digits).parse().ok()?;
        Decimal::try_from_i128_with_scale(mantissa, scale).ok()
    }

    pub fn to_big_decimal(&self) -> Result<BigDecimal, DecodeError> {
        BigDecimal::from_str(&format!("{}{}e{}", self.sign(), self.digits, -self.scale))
            .map_err(|_| DecodeError::Overflow)
    }

    /// `Field::Decimal` when the value fits, `Field::BigDecimal` otherwise.
    pub fn into_field(self) -> Result<Field, DecodeError> {
        match self.to_decimal() {
            Some(value) => Ok(Field::Decimal(value)),
            None => self.to_big_decimal().map(Field::BigDecimal),
        }
    }
}

impl Display for OracleNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.sign())?;
        if let Some(digits) = self.integer_digits() {
            return f.write_str(&digits);
        }
        let scale = self.scale as usize;
        if self.digits.len() > scale {
            let (integer, fraction) = self.digits.split_at(self.digits.len() - scale);
            write!(f, "{integer}.{fraction}")
        } else {
            write!(f, "0.{}{}", "0".repeat(scale - self.digits.len()), self.digits)
        }
    }
}

/// Decodes Oracle's variable-length NUMBER format.
///
/// The first byte holds sign and base-100 exponent, every following byte one base-100 digit.
/// Positive digits are stored plus one, negative digits as 101 minus the digit with an
/// optional trailing 102.
pub fn decode_number(bytes: &[u8]) -> Result<OracleNumber, DecodeError> {
    let (&head, digits) = bytes.split_first().ok_or(DecodeError::Empty)?;
    if head == ZERO {
        return Ok(OracleNumber::zero());
    }

    let negative = head & 0x80 == 0;
    let (exponent, digits) = if negative {
        let digits = match digits.split_last() {
            Some((&NEGATIVE_TERMINATOR, rest)) => rest,
            _ => digits,
        };
        (NEGATIVE_EXPONENT_BIAS - head as i32, digits)
    } else {
        (head as i32 - POSITIVE_EXPONENT_BIAS, digits)
    };
    if digits.is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut decimal_digits = String::with_capacity(2 * digits.len());
    for &byte in digits {
        let digit = if negative {
            101 - byte as i32
        } else {
            byte as i32 - 1
        };
        if !(0..100).contains(&digit) {
            return Err(DecodeError::Digit(byte));
        }
        decimal_digits.push_str(&format!("{digit:02}"));
    }

    // value = mantissa * 100^(exponent - (digits - 1))
    let mut scale = 2 * (digits.len() as i64 - 1 - exponent as i64);
    let trimmed = decimal_digits.trim_end_matches('0');
    scale -= (decimal_digits.len() - trimmed.len()) as i64;
    let trimmed = trimmed.trim_start_matches('0');
    if trimmed.is_empty() {
        return Ok(OracleNumber::zero());
    }
    Ok(OracleNumber {
        negative,
        digits: trimmed.to_string(),
        scale,
    })
}

/// BINARY_FLOAT is IEEE 754 stored big-endian with the bits arranged to sort bytewise.
pub fn decode_binary_float(bytes: &[u8]) -> Result<Field, DecodeError> {
    if bytes.len() != 4 {
        return Err(DecodeError::Length {
            expected: "4",
            actual: bytes.len(),
        });
    }
    let bits = BigEndian::read_u32(bytes);
    let bits = if bits & 0x8000_0000 != 0 {
        bits & !0x8000_0000
    } else {
        !bits
    };
    Ok(Field::Float(OrderedFloat(f32::from_bits(bits))))
}

pub fn decode_binary_double(bytes: &[u8]) -> Result<Field, DecodeError> {
    if bytes.len() != 8 {
        return Err(DecodeError::Length {
            expected: "8",
            actual: bytes.len(),
        });
    }
    let bits = BigEndian::read_u64(bytes);
    let bits = if bits & 0x8000_0000_0000_0000 != 0 {
        bits & !0x8000_0000_0000_0000
    } else {
        !bits
    };
    Ok(Field::Double(OrderedFloat(f64::from_bits(bits))))
}
