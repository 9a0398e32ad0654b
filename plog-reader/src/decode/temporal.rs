use byteorder::{BigEndian, ByteOrder};
use plog_types::{
    chrono::{NaiveDate, TimeZone, Utc},
    types::Field,
};

use super::DecodeError;

const INTERVAL_BIAS: i64 = 0x8000_0000;
const INTERVAL_FIELD_BIAS: i64 = 60;

/// DATE: century + 100, year of century + 100, month, day, hour + 1, minute + 1, second + 1.
pub fn decode_date(bytes: &[u8]) -> Result<Field, DecodeError> {
    if bytes.len() != 7 {
        return Err(DecodeError::Length {
            expected: "7",
            actual: bytes.len(),
        });
    }
    date_time(bytes, 0)
}

/// TIMESTAMP and TIMESTAMP WITH LOCAL TIME ZONE: a DATE, optionally followed by big-endian
/// nanoseconds. Local time zone values are stored normalized to UTC.
pub fn decode_timestamp(bytes: &[u8]) -> Result<Field, DecodeError> {
    match bytes.len() {
        7 => date_time(bytes, 0),
        11 => date_time(bytes, BigEndian::read_u32(&bytes[7..11])),
        actual => Err(DecodeError::Length {
            expected: "7 or 11",
            actual,
        }),
    }
}

/// TIMESTAMP WITH TIME ZONE is stored in UTC. The trailing region bytes are not needed.
pub fn decode_timestamp_tz(bytes: &[u8]) -> Result<Field, DecodeError> {
    if bytes.len() != 13 {
        return Err(DecodeError::Length {
            expected: "13",
            actual: bytes.len(),
        });
    }
    date_time(bytes, BigEndian::read_u32(&bytes[7..11]))
}

fn date_time(bytes: &[u8], nanos: u32) -> Result<Field, DecodeError> {
    let year = (bytes[0] as i32 - 100) * 100 + (bytes[1] as i32 - 100);
    let date = NaiveDate::from_ymd_opt(year, bytes[2] as u32, bytes[3] as u32)
        .and_then(|date| {
            date.and_hms_nano_opt(
                (bytes[4] as u32).wrapping_sub(1),
                (bytes[5] as u32).wrapping_sub(1),
                (bytes[6] as u32).wrapping_sub(1),
                nanos,
            )
        })
        .ok_or(DecodeError::DateTime)?;
    Ok(Field::Timestamp(Utc.from_utc_datetime(&date)))
}

/// INTERVAL DAY TO SECOND: biased days (4 bytes), hours, minutes, seconds (each + 60) and
/// biased nanoseconds (4 bytes).
pub fn decode_interval_ds(bytes: &[u8]) -> Result<Field, DecodeError> {
    if bytes.len() != 11 {
        return Err(DecodeError::Length {
            expected: "11",
            actual: bytes.len(),
        });
    }
    let days = BigEndian::read_u32(&bytes[0..4]) as i64 - INTERVAL_BIAS;
    let hours = bytes[4] as i64 - INTERVAL_FIELD_BIAS;
    let minutes = bytes[5] as i64 - INTERVAL_FIELD_BIAS;
    let seconds = bytes[6] as i64 - INTERVAL_FIELD_BIAS;
    let nanos = BigEndian::read_u32(&bytes[7..11]) as i64 - INTERVAL_BIAS;
    let negative = days < 0 || hours < 0 || minutes < 0 || seconds < 0 || nanos < 0;
    Ok(Field::Interval(format!(
        "{}{:02} {:02}:{:02}:{:02}.{:09}",
        sign(negative),
        days.abs(),
        hours.abs(),
        minutes.abs(),
        seconds.abs(),
        nanos.abs()
    )))
}

/// INTERVAL YEAR TO MONTH: biased years (4 bytes) and months + 60.
pub fn decode_interval_ym(bytes: &[u8]) -> Result<Field, DecodeError> {
    if bytes.len() != 5 {
        return Err(DecodeError::Length {
            expected: "5",
            actual: bytes.len(),
        });
    }
    let years = BigEndian::read_u32(&bytes[0..4]) as i64 - INTERVAL_BIAS;
    let months = bytes[4] as i64 - INTERVAL_FIELD_BIAS;
    Ok(Field::Interval(format!(
        "{}{:02}-{:02}",
        sign(years < 0 || months < 0),
        years.abs(),
        months.abs()
    )))
}

fn sign(negative: bool) -> char {
    if negative {
        '-'
    } else {
        '+'
    }
}
