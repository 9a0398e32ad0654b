use std::io::Read;

use plog_types::{indexmap::IndexMap, kind::EntryKind};

use crate::errors::{Error, Result};

use super::{
    chunk::{ChunkReader, CHUNK_SIZE},
    classify::{classify, ETYPE_CONTROL, ESTYPE_FOOTER},
    tag::{TagRecord, TagType, TAG_HEADER_CHUNKS},
};

/// Chunks preceding an entry's tags: length, major type and subtype.
pub const ENTRY_HEADER_CHUNKS: u32 = 3;

/// One framed entry, tags grouped by type in encoded order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    /// Length in chunks, header included.
    pub length: u32,
    pub major: u32,
    pub subtype: u32,
    /// Byte offset of the entry's first chunk.
    pub offset: u64,
    pub kind: EntryKind,
    pub tags: IndexMap<TagType, Vec<TagRecord>>,
}

impl EntryRecord {
    pub fn tags(&self, tag_type: TagType) -> &[TagRecord] {
        self.tags.get(&tag_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, tag_type: TagType) -> Option<&TagRecord> {
        self.tags(tag_type).first()
    }

    pub fn has(&self, tag_type: TagType) -> bool {
        !self.tags(tag_type).is_empty()
    }

    pub fn u32_tag(&self, tag_type: TagType) -> Result<Option<u32>> {
        self.first(tag_type).map(TagRecord::as_u32).transpose()
    }

    pub fn u64_tag(&self, tag_type: TagType) -> Result<Option<u64>> {
        self.first(tag_type).map(TagRecord::as_u64).transpose()
    }

    pub fn str_tag(&self, tag_type: TagType) -> Result<Option<String>> {
        self.first(tag_type).map(TagRecord::as_str).transpose()
    }

    /// Raw encoded size of the entry.
    pub fn size_in_bytes(&self) -> u64 {
        self.length as u64 * CHUNK_SIZE
    }
}

/// Frames entries out of a chunk stream.
#[derive(Debug)]
pub struct EntryReader<R> {
    chunks: ChunkReader<R>,
}

impl<R: Read> EntryReader<R> {
    pub fn new(chunks: ChunkReader<R>) -> Self {
        Self { chunks }
    }

    pub fn offset(&self) -> u64 {
        self.chunks.offset()
    }

    pub fn chunks_mut(&mut self) -> &mut ChunkReader<R> {
        &mut self.chunks
    }

    /// Reads the next entry. A clean end of input before the entry is [`Error::StreamClosed`].
    pub fn next_entry(&mut self) -> Result<EntryRecord> {
        let offset = self.chunks.offset();
        let length = self.chunks.read_chunk()?.ok_or(Error::StreamClosed)?;
        if length < ENTRY_HEADER_CHUNKS {
            return Err(Error::MalformedEntry {
                offset,
                reason: format!("length {} is shorter than the entry header", length),
            });
        }
        let major = self.chunks.read_required()?;
        let subtype = self.chunks.read_required()?;
        if major == ETYPE_CONTROL && subtype == ESTYPE_FOOTER && length != ENTRY_HEADER_CHUNKS {
            return Err(Error::MalformedEntry {
                offset,
                reason: format!("footer of {} chunks", length),
            });
        }

        let mut tags: IndexMap<TagType, Vec<TagRecord>> = IndexMap::new();
        let mut remaining = length - ENTRY_HEADER_CHUNKS;
        let mut seq = 0;
        while remaining > 0 {
            if remaining < TAG_HEADER_CHUNKS {
                return Err(Error::MalformedEntry {
                    offset,
                    reason: format!("{} trailing chunks cannot hold a tag", remaining),
                });
            }
            let tag_length = self.chunks.read_required()?;
            let id = self.chunks.read_required()?;
            if tag_length < TAG_HEADER_CHUNKS || tag_length > remaining {
                return Err(Error::MalformedEntry {
                    offset,
                    reason: format!(
                        "tag {:#06x} of {} chunks does not fit the {} remaining",
                        id, tag_length, remaining
                    ),
                });
            }
            let payload = self
                .chunks
                .read_chunks((tag_length - TAG_HEADER_CHUNKS) as usize)?;
            let tag_type = TagType::from_id(id);
            tags.entry(tag_type).or_default().push(TagRecord {
                length: tag_length,
                id,
                tag_type,
                payload,
                seq,
            });
            seq += 1;
            remaining -= tag_length;
        }

        Ok(EntryRecord {
            length,
            major,
            subtype,
            offset,
            kind: classify(major, subtype),
            tags,
        })
    }
}
