//! Builds PLOG byte streams for tests.

use std::{
    io::{self, Cursor, ErrorKind, Read},
    sync::Arc,
};

use fxhash::FxHashMap;
use plog_types::{
    chrono::{Datelike, NaiveDateTime, Timelike},
    kind::EntryKind,
    offset::PlogFile,
    parking_lot::Mutex,
    rust_decimal::Decimal,
};

use crate::{
    format::{
        chunk::CHUNK_SIZE,
        classify::entry_type,
        entry::ENTRY_HEADER_CHUNKS,
        tag::{
            TAG_COLUMN_ID, TAG_DDL_JSON, TAG_FEATURES, TAG_HEADER_CHUNKS, TAG_INCLUDE_FILE_ID,
            TAG_INCLUDE_FILE_NAME, TAG_INCLUDE_ROWS, TAG_INCLUDE_START, TAG_OBJECT_ID,
            TAG_OBJECT_NAME, TAG_OBJECT_OWNER, TAG_SCN, TAG_TIMESTAMP, TAG_XID,
        },
        FEATURE_COMMIT_ONLY, FEATURE_SCHEMA_DOCUMENT, SIGNATURE,
    },
    stream::IncludeSource,
};

/// Features a decodable file announces.
pub const DATA_FEATURES: u32 = FEATURE_COMMIT_ONLY | FEATURE_SCHEMA_DOCUMENT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: u32,
    pub payload: Vec<u32>,
}

impl Tag {
    pub fn new(id: u32, payload: Vec<u32>) -> Self {
        Self { id, payload }
    }

    pub fn u32(id: u32, value: u32) -> Self {
        Self::new(id, vec![value])
    }

    pub fn u64(id: u32, value: u64) -> Self {
        Self::new(id, vec![value as u32, (value >> 32) as u32])
    }

    pub fn bytes(id: u32, bytes: &[u8]) -> Self {
        let mut payload = vec![bytes.len() as u32];
        payload.extend(bytes.chunks(CHUNK_SIZE as usize).map(|chunk| {
            let mut padded = [0u8; CHUNK_SIZE as usize];
            padded[..chunk.len()].copy_from_slice(chunk);
            u32::from_le_bytes(padded)
        }));
        Self::new(id, payload)
    }

    pub fn str(id: u32, value: &str) -> Self {
        Self::bytes(id, value.as_bytes())
    }

    /// A value tag encoding SQL NULL.
    pub fn null(id: u32) -> Self {
        Self::new(id, vec![])
    }

    pub fn value(id: u32, value: Option<&[u8]>) -> Self {
        match value {
            Some(bytes) => Self::bytes(id, bytes),
            None => Self::null(id),
        }
    }

    fn length(&self) -> u32 {
        self.payload.len() as u32 + TAG_HEADER_CHUNKS
    }
}

/// Tag list of a change entry, in encoded order.
#[derive(Debug, Clone, Default)]
pub struct ChangeTags {
    tags: Vec<Tag>,
}

impl ChangeTags {
    pub fn new(xid: &str, scn: u64, timestamp: u64) -> Self {
        Self {
            tags: vec![
                Tag::str(TAG_XID, xid),
                Tag::u64(TAG_SCN, scn),
                Tag::u64(TAG_TIMESTAMP, timestamp),
            ],
        }
    }

    pub fn table(mut self, object_id: u32) -> Self {
        self.tags.push(Tag::u32(TAG_OBJECT_ID, object_id));
        self
    }

    pub fn owner(mut self, owner: &str, name: &str) -> Self {
        self.tags.push(Tag::str(TAG_OBJECT_OWNER, owner));
        self.tags.push(Tag::str(TAG_OBJECT_NAME, name));
        self
    }

    pub fn column(mut self, ordinal: u32) -> Self {
        self.tags.push(Tag::u32(TAG_COLUMN_ID, ordinal));
        self
    }

    /// A column id followed by one image of it.
    pub fn value(self, ordinal: u32, image: u32, value: Option<&[u8]>) -> Self {
        self.column(ordinal).tag(Tag::value(image, value))
    }

    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn into_tags(self) -> Vec<Tag> {
        self.tags
    }
}

/// Appends framed entries to an in-memory PLOG file.
#[derive(Debug, Clone)]
pub struct PlogWriter {
    bytes: Vec<u8>,
}

impl Default for PlogWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PlogWriter {
    /// Starts a file with signature and version 1.0.
    pub fn new() -> Self {
        let mut writer = Self::bare();
        writer.bytes.extend_from_slice(&SIGNATURE);
        writer.chunk(1).chunk(0);
        writer
    }

    /// No file header, for entry level tests.
    pub fn bare() -> Self {
        Self { bytes: vec![] }
    }

    /// Byte offset the next entry is written at.
    pub fn offset(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn header(self, features: u32) -> Self {
        self.entry(EntryKind::Header, vec![Tag::u32(TAG_FEATURES, features)])
    }

    pub fn metadata(self, json: &str) -> Self {
        self.entry(EntryKind::Metadata, vec![Tag::str(TAG_DDL_JSON, json)])
    }

    pub fn change(self, kind: EntryKind, tags: ChangeTags) -> Self {
        self.entry(kind, tags.into_tags())
    }

    pub fn include(self, file_id: u64, name: &str, start: u32) -> Self {
        self.entry(
            EntryKind::IncludeFile,
            vec![
                Tag::u64(TAG_INCLUDE_FILE_ID, file_id),
                Tag::str(TAG_INCLUDE_FILE_NAME, name),
                Tag::u32(TAG_INCLUDE_START, start),
            ],
        )
    }

    pub fn include_stats(self, rows: u64) -> Self {
        self.entry(
            EntryKind::IncludeStats,
            vec![Tag::u64(TAG_INCLUDE_ROWS, rows)],
        )
    }

    pub fn footer(self) -> Self {
        self.entry(EntryKind::Footer, vec![])
    }

    pub fn entry(self, kind: EntryKind, tags: Vec<Tag>) -> Self {
        let (major, subtype) = entry_type(kind).expect("entry kind without a wire type");
        self.raw_entry(major, subtype, tags)
    }

    pub fn raw_entry(mut self, major: u32, subtype: u32, tags: Vec<Tag>) -> Self {
        let length = ENTRY_HEADER_CHUNKS + tags.iter().map(Tag::length).sum::<u32>();
        self.chunk(length).chunk(major).chunk(subtype);
        for tag in tags {
            self.chunk(tag.length()).chunk(tag.id);
            for chunk in tag.payload {
                self.chunk(chunk);
            }
        }
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn chunk(&mut self, chunk: u32) -> &mut Self {
        self.bytes.extend_from_slice(&chunk.to_le_bytes());
        self
    }
}

/// Included files kept in memory, by name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: FxHashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn with_file(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(name.to_string(), bytes);
        self
    }
}

impl IncludeSource for MemorySource {
    fn open(&self, file: &PlogFile) -> io::Result<Box<dyn Read + Send>> {
        let bytes = self
            .files
            .get(&file.name)
            .cloned()
            .ok_or_else(|| io::Error::new(ErrorKind::NotFound, file.name.clone()))?;
        Ok(Box::new(Cursor::new(bytes)))
    }
}

/// A source that can be appended to while it is being read, like a file still being written.
#[derive(Debug, Clone, Default)]
pub struct GrowingReader {
    bytes: Arc<Mutex<Vec<u8>>>,
    position: usize,
}

impl GrowingReader {
    pub fn append(&self, bytes: &[u8]) {
        self.bytes.lock().extend_from_slice(bytes);
    }
}

impl Read for GrowingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes = self.bytes.lock();
        let available = &bytes[self.position.min(bytes.len())..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.position += n;
        Ok(n)
    }
}

/// Oracle NUMBER encoding of a decimal.
pub fn encode_number(value: Decimal) -> Vec<u8> {
    if value.is_zero() {
        return vec![0x80];
    }
    let negative = value.is_sign_negative();
    let mut digits = value.mantissa().unsigned_abs().to_string();
    let mut scale = value.scale() as i32;
    if scale % 2 != 0 {
        digits.push('0');
        scale += 1;
    }
    if digits.len() % 2 != 0 {
        digits.insert(0, '0');
    }
    let pairs: Vec<u8> = digits
        .as_bytes()
        .chunks(2)
        .map(|pair| (pair[0] - b'0') * 10 + (pair[1] - b'0'))
        .collect();

    let mut exponent = pairs.len() as i32 - 1 - scale / 2;
    let leading = pairs.iter().take_while(|digit| **digit == 0).count();
    exponent -= leading as i32;
    let trailing = pairs.iter().rev().take_while(|digit| **digit == 0).count();
    let pairs = &pairs[leading..pairs.len() - trailing];

    if negative {
        let mut bytes = vec![(0x3E - exponent) as u8];
        bytes.extend(pairs.iter().map(|digit| 101 - digit));
        if pairs.len() < 20 {
            bytes.push(102);
        }
        bytes
    } else {
        let mut bytes = vec![(exponent + 0xC1) as u8];
        bytes.extend(pairs.iter().map(|digit| digit + 1));
        bytes
    }
}

/// Oracle DATE encoding.
pub fn encode_date(value: NaiveDateTime) -> Vec<u8> {
    let year = value.year();
    vec![
        (year / 100 + 100) as u8,
        (year % 100 + 100) as u8,
        value.month() as u8,
        value.day() as u8,
        value.hour() as u8 + 1,
        value.minute() as u8 + 1,
        value.second() as u8 + 1,
    ]
}

/// Oracle TIMESTAMP encoding with fractional seconds.
pub fn encode_timestamp(value: NaiveDateTime) -> Vec<u8> {
    let mut bytes = encode_date(value);
    bytes.extend_from_slice(&value.nanosecond().to_be_bytes());
    bytes
}

pub fn encode_interval_ds(days: i32, hours: i8, minutes: i8, seconds: i8, nanos: i32) -> Vec<u8> {
    let mut bytes = biased(days).to_vec();
    bytes.extend([hours, minutes, seconds].map(|field| (field as i32 + 60) as u8));
    bytes.extend_from_slice(&biased(nanos));
    bytes
}

pub fn encode_interval_ym(years: i32, months: i8) -> Vec<u8> {
    let mut bytes = biased(years).to_vec();
    bytes.push((months as i32 + 60) as u8);
    bytes
}

/// National character set encoding.
pub fn encode_utf16(value: &str) -> Vec<u8> {
    value.encode_utf16().flat_map(u16::to_be_bytes).collect()
}

fn biased(value: i32) -> [u8; 4] {
    ((value as i64 + 0x8000_0000) as u32).to_be_bytes()
}

#[cfg(test)]
mod tests {
    use plog_types::chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_number_encoding() {
        assert_eq!(encode_number(Decimal::ZERO), vec![0x80]);
        assert_eq!(encode_number(Decimal::new(12345, 2)), vec![0xC2, 0x02, 0x18, 0x2E]);
        assert_eq!(
            encode_number(Decimal::new(-12345, 2)),
            vec![0x3D, 0x64, 0x4E, 0x38, 0x66]
        );
        assert_eq!(encode_number(Decimal::new(5, 2)), vec![0xC0, 0x06]);
        assert_eq!(encode_number(Decimal::new(1_000_000, 0)), vec![0xC4, 0x02]);
        assert_eq!(encode_number(Decimal::new(9999, 0)), vec![0xC2, 0x64, 0x64]);
    }

    #[test]
    fn test_temporal_encoding() {
        let value = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_nano_opt(13, 5, 0, 123_456_789)
            .unwrap();
        assert_eq!(encode_date(value), vec![120, 124, 2, 29, 14, 6, 1]);
        assert_eq!(
            encode_timestamp(value),
            vec![120, 124, 2, 29, 14, 6, 1, 0x07, 0x5B, 0xCD, 0x15]
        );
        assert_eq!(
            encode_interval_ds(3, 4, 5, 6, 700_000_000),
            vec![0x80, 0x00, 0x00, 0x03, 64, 65, 66, 0xA9, 0xB9, 0x27, 0x00]
        );
        assert_eq!(encode_interval_ym(-10, -6), vec![0x7F, 0xFF, 0xFF, 0xF6, 54]);
    }

    #[test]
    fn test_entry_framing() {
        let bytes = PlogWriter::new()
            .entry(EntryKind::Commit, vec![Tag::str(TAG_XID, "1.2.3")])
            .into_bytes();
        // signature, version, then [length, major, subtype, tag length, tag id, byte length, 2 chunks]
        assert_eq!(bytes.len(), 8 + 8 + 8 * 4);
        assert_eq!(&bytes[16..20], &8u32.to_le_bytes());
    }
}
