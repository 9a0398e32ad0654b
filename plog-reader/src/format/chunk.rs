use std::io::{ErrorKind, Read};

use byteorder::{ByteOrder, LittleEndian};

use crate::errors::{Error, Result};

pub const CHUNK_SIZE: u64 = 4;

/// Reads the format's 4-byte little-endian integer chunks and keeps track of the byte offset.
#[derive(Debug)]
pub struct ChunkReader<R> {
    source: R,
    offset: u64,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(source: R) -> Self {
        Self { source, offset: 0 }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads one chunk. `Ok(None)` means the source ended cleanly before the chunk.
    pub fn read_chunk(&mut self) -> Result<Option<u32>> {
        let mut buf = [0u8; CHUNK_SIZE as usize];
        match self.fill(&mut buf)? {
            0 => Ok(None),
            n if n < buf.len() => Err(Error::Truncated(self.offset)),
            _ => Ok(Some(LittleEndian::read_u32(&buf))),
        }
    }

    /// Reads one chunk that must be present.
    pub fn read_required(&mut self) -> Result<u32> {
        self.read_chunk()?.ok_or(Error::Truncated(self.offset))
    }

    pub fn read_chunks(&mut self, count: usize) -> Result<Vec<u32>> {
        // Counts come from the stream itself, don't trust them for allocation.
        let mut chunks = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            chunks.push(self.read_required()?);
        }
        Ok(chunks)
    }

    /// Reads raw bytes. `Ok(None)` means the source ended cleanly before the first byte.
    pub fn read_bytes<const N: usize>(&mut self) -> Result<Option<[u8; N]>> {
        let mut buf = [0u8; N];
        match self.fill(&mut buf)? {
            0 => Ok(None),
            n if n < N => Err(Error::Truncated(self.offset)),
            _ => Ok(Some(buf)),
        }
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.source.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.offset += filled as u64;
        Ok(filled)
    }
}

/// Recovers the encoded byte sequence from payload chunks.
pub fn chunks_to_bytes(chunks: &[u32], len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; chunks.len() * CHUNK_SIZE as usize];
    LittleEndian::write_u32_into(chunks, &mut bytes);
    bytes.truncate(len);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_end_and_truncation() {
        let mut reader = ChunkReader::new(&[1u8, 0, 0, 0, 2, 0][..]);
        assert_eq!(reader.read_chunk().unwrap(), Some(1));
        assert_eq!(reader.offset(), 4);
        assert!(matches!(reader.read_chunk(), Err(Error::Truncated(6))));

        let mut reader = ChunkReader::new(&[7u8, 0, 0, 0][..]);
        assert_eq!(reader.read_chunk().unwrap(), Some(7));
        assert_eq!(reader.read_chunk().unwrap(), None);
        assert!(matches!(reader.read_required(), Err(Error::Truncated(4))));
    }

    #[test]
    fn test_chunks_to_bytes() {
        let chunks = [u32::from_le_bytes(*b"ABCD"), u32::from_le_bytes(*b"E\0\0\0")];
        assert_eq!(chunks_to_bytes(&chunks, 5), b"ABCDE");
    }
}
