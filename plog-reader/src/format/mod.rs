use std::io::Read;

use crate::errors::{Error, Result};

use self::chunk::ChunkReader;

pub mod chunk;
pub mod classify;
pub mod entry;
pub mod tag;

pub const SIGNATURE: [u8; 8] = *b"PLOG\n \x0b\r";
pub const SUPPORTED_MAJOR_VERSION: u32 = 1;

pub const FEATURE_COMPACT_DICTIONARY: u32 = 0x1;
pub const FEATURE_SCHEMA_DOCUMENT: u32 = 0x2;
pub const FEATURE_COMMIT_ONLY: u32 = 0x4;
pub const FEATURE_PRESERIALIZED_TRANSACTIONS: u32 = 0x8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub major: u32,
    pub minor: u32,
}

pub fn read_file_header<R: Read>(chunks: &mut ChunkReader<R>) -> Result<FileHeader> {
    let signature = chunks
        .read_bytes::<8>()?
        .ok_or(Error::Truncated(chunks.offset()))?;
    if signature != SIGNATURE {
        return Err(Error::InvalidSignature(signature));
    }
    let major = chunks.read_required()?;
    let minor = chunks.read_required()?;
    if major != SUPPORTED_MAJOR_VERSION {
        return Err(Error::UnsupportedVersion { major, minor });
    }
    Ok(FileHeader { major, minor })
}

/// Feature bits announced by the header entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Features(pub u32);

impl Features {
    pub fn contains(&self, flags: u32) -> bool {
        self.0 & flags == flags
    }

    /// Data entries can only be decoded when both are present.
    pub fn supports_data(&self) -> bool {
        self.contains(FEATURE_COMMIT_ONLY | FEATURE_SCHEMA_DOCUMENT)
    }
}
