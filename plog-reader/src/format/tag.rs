use crate::errors::{Error, Result};

use super::chunk::{chunks_to_bytes, CHUNK_SIZE};

/// Chunks preceding a tag's payload: length and tag id.
pub const TAG_HEADER_CHUNKS: u32 = 2;

pub const TAG_FEATURES: u32 = 0x0001;
pub const TAG_XID: u32 = 0x0100;
pub const TAG_SCN: u32 = 0x0101;
pub const TAG_TIMESTAMP: u32 = 0x0102;
pub const TAG_OBJECT_ID: u32 = 0x0200;
pub const TAG_OBJECT_OWNER: u32 = 0x0201;
pub const TAG_OBJECT_NAME: u32 = 0x0202;
pub const TAG_COLUMN_ID: u32 = 0x0300;
pub const TAG_COLUMN_NAME: u32 = 0x0301;
pub const TAG_COLUMN_TYPE: u32 = 0x0302;
pub const TAG_KEY_IMAGE: u32 = 0x0310;
pub const TAG_OLD_IMAGE: u32 = 0x0311;
pub const TAG_NEW_IMAGE: u32 = 0x0312;
pub const TAG_LOB_DATA: u32 = 0x0313;
pub const TAG_LOB_OFFSET: u32 = 0x0320;
pub const TAG_LOB_LENGTH: u32 = 0x0321;
pub const TAG_LOB_POSITION: u32 = 0x0322;
pub const TAG_DDL_JSON: u32 = 0x0400;
pub const TAG_DDL_SQL: u32 = 0x0401;
pub const TAG_INCLUDE_FILE_ID: u32 = 0x0500;
pub const TAG_INCLUDE_FILE_NAME: u32 = 0x0501;
pub const TAG_INCLUDE_START: u32 = 0x0502;
pub const TAG_INCLUDE_ROWS: u32 = 0x0503;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagType {
    Features,
    Xid,
    Scn,
    Timestamp,
    ObjectId,
    ObjectOwner,
    ObjectName,
    ColumnId,
    ColumnName,
    ColumnType,
    KeyImage,
    OldImage,
    NewImage,
    LobData,
    LobOffset,
    LobLength,
    LobPosition,
    DdlJson,
    DdlSql,
    IncludeFileId,
    IncludeFileName,
    IncludeStart,
    IncludeRows,
    Unknown,
}

impl TagType {
    pub fn from_id(id: u32) -> Self {
        match id {
            TAG_FEATURES => TagType::Features,
            TAG_XID => TagType::Xid,
            TAG_SCN => TagType::Scn,
            TAG_TIMESTAMP => TagType::Timestamp,
            TAG_OBJECT_ID => TagType::ObjectId,
            TAG_OBJECT_OWNER => TagType::ObjectOwner,
            TAG_OBJECT_NAME => TagType::ObjectName,
            TAG_COLUMN_ID => TagType::ColumnId,
            TAG_COLUMN_NAME => TagType::ColumnName,
            TAG_COLUMN_TYPE => TagType::ColumnType,
            TAG_KEY_IMAGE => TagType::KeyImage,
            TAG_OLD_IMAGE => TagType::OldImage,
            TAG_NEW_IMAGE => TagType::NewImage,
            TAG_LOB_DATA => TagType::LobData,
            TAG_LOB_OFFSET => TagType::LobOffset,
            TAG_LOB_LENGTH => TagType::LobLength,
            TAG_LOB_POSITION => TagType::LobPosition,
            TAG_DDL_JSON => TagType::DdlJson,
            TAG_DDL_SQL => TagType::DdlSql,
            TAG_INCLUDE_FILE_ID => TagType::IncludeFileId,
            TAG_INCLUDE_FILE_NAME => TagType::IncludeFileName,
            TAG_INCLUDE_START => TagType::IncludeStart,
            TAG_INCLUDE_ROWS => TagType::IncludeRows,
            _ => TagType::Unknown,
        }
    }

    /// Tags carrying a column image.
    pub fn is_image(&self) -> bool {
        matches!(
            self,
            TagType::KeyImage | TagType::OldImage | TagType::NewImage | TagType::LobData
        )
    }
}

/// One tagged data unit of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    /// Length in chunks, header included.
    pub length: u32,
    pub id: u32,
    pub tag_type: TagType,
    pub payload: Vec<u32>,
    /// Position among all tags of the entry, regardless of type.
    pub seq: usize,
}

impl TagRecord {
    pub fn as_u32(&self) -> Result<u32> {
        self.payload
            .first()
            .copied()
            .ok_or_else(|| self.malformed("expected 1 chunk, payload is empty"))
    }

    /// 64-bit values span two chunks, low word first.
    pub fn as_u64(&self) -> Result<u64> {
        match self.payload.as_slice() {
            [low, high, ..] => Ok(((*high as u64) << 32) | *low as u64),
            _ => Err(self.malformed(format!(
                "expected 2 chunks, payload has {}",
                self.payload.len()
            ))),
        }
    }

    /// Byte length chunk followed by the bytes, padded to the chunk size.
    pub fn as_bytes(&self) -> Result<Vec<u8>> {
        let (&len, data) = self
            .payload
            .split_first()
            .ok_or_else(|| self.malformed("missing byte length"))?;
        let len = len as usize;
        if len > data.len() * CHUNK_SIZE as usize {
            return Err(self.malformed(format!(
                "byte length {} exceeds payload of {} chunks",
                len,
                data.len()
            )));
        }
        Ok(chunks_to_bytes(data, len))
    }

    pub fn as_str(&self) -> Result<String> {
        String::from_utf8(self.as_bytes()?).map_err(|e| self.malformed(e.to_string()))
    }

    /// Column image. An empty payload encodes SQL NULL.
    pub fn as_value(&self) -> Result<Option<Vec<u8>>> {
        if self.payload.is_empty() {
            Ok(None)
        } else {
            self.as_bytes().map(Some)
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::MalformedTag {
            id: self.id,
            reason: reason.into(),
        }
    }
}
