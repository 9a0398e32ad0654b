use byteorder::{BigEndian, ByteOrder};
use plog_types::types::Field;

use super::DecodeError;

pub fn decode_utf8(bytes: &[u8]) -> Result<Field, DecodeError> {
    Ok(Field::String(String::from_utf8(bytes.to_vec())?))
}

/// National character set values are UTF-16, big-endian.
pub fn decode_utf16(bytes: &[u8]) -> Result<Field, DecodeError> {
    if bytes.len() % 2 != 0 {
        return Err(DecodeError::Length {
            expected: "an even number of",
            actual: bytes.len(),
        });
    }
    let units = bytes.chunks_exact(2).map(BigEndian::read_u16);
    let string = char::decode_utf16(units).collect::<Result<String, _>>()?;
    Ok(Field::String(string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text() {
        assert_eq!(
            decode_utf8("Zürich".as_bytes()).unwrap(),
            Field::String("Zürich".to_string())
        );
        assert!(matches!(
            decode_utf8(&[0xC3, 0x28]),
            Err(DecodeError::Utf8(_))
        ));
        // U+00FC, then U+1F600 as a surrogate pair
        assert_eq!(
            decode_utf16(&[0x00, 0xFC, 0xD8, 0x3D, 0xDE, 0x00]).unwrap(),
            Field::String("ü😀".to_string())
        );
        assert!(matches!(
            decode_utf16(&[0xD8, 0x3D]),
            Err(DecodeError::Utf16(_))
        ));
        assert!(matches!(
            decode_utf16(&[0x00]),
            Err(DecodeError::Length { .. })
        ));
    }
}
