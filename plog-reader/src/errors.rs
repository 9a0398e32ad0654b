use plog_types::{serde_json, thiserror};

use crate::decode::DecodeError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stream closed")]
    StreamClosed,
    #[error("stream truncated at byte offset {0}")]
    Truncated(u64),
    #[error("invalid PLOG signature: {0:02X?}")]
    InvalidSignature([u8; 8]),
    #[error("unsupported PLOG version {major}.{minor}")]
    UnsupportedVersion { major: u32, minor: u32 },
    #[error("malformed entry at byte offset {offset}: {reason}")]
    MalformedEntry { offset: u64, reason: String },
    #[error("malformed tag {id:#06x}: {reason}")]
    MalformedTag { id: u32, reason: String },
    #[error("file does not declare the commit-only and schema document features required to decode data entries")]
    UnsupportedFeatures,
    #[error("invalid schema document: {0}")]
    SchemaDocument(#[from] serde_json::Error),
    #[error("invalid schema document for {table}: {reason}")]
    InvalidSchemaDocument { table: String, reason: String },
    #[error("incompatible DDL for {table}: column {ordinal} changed from {old} to {new}")]
    IncompatibleDdl {
        table: String,
        ordinal: u32,
        old: String,
        new: String,
    },
    #[error("no schema for table id {0} carrying column data")]
    MissingSchema(u32),
    #[error("tag count mismatch for table id {table_id}: {column_ids} column ids, {names} names, {types} types")]
    TagCountMismatch {
        table_id: u32,
        column_ids: usize,
        names: usize,
        types: usize,
    },
    #[error("column {0} has a value but no definition")]
    UndescribedColumn(u32),
    #[error("unsupported data type {data_type} of column {column}")]
    UnsupportedType { column: String, data_type: String },
    #[error("cannot decode {data_type} value of column {column}: {source}")]
    InvalidValue {
        column: String,
        data_type: String,
        #[source]
        source: DecodeError,
    },
    #[error("cannot merge column {ordinal} into record {key}: cached {cached}, current {current}")]
    MergeMismatch {
        key: String,
        ordinal: u32,
        cached: String,
        current: String,
    },
    #[error("included file {0} referenced but no include source is configured")]
    MissingIncludeSource(String),
}

impl Error {
    /// A clean end of the currently available input is the only recoverable condition.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::StreamClosed)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
