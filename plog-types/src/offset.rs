use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// A PLOG file as handed over by the file manager.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlogFile {
    /// Redo log sequence the file was mined from.
    pub sequence: u32,
    /// Creation time of the file, seconds since epoch.
    pub timestamp: u32,
    pub name: String,
}

impl PlogFile {
    pub fn new(sequence: u32, timestamp: u32, name: impl Into<String>) -> Self {
        Self {
            sequence,
            timestamp,
            name: name.into(),
        }
    }

    pub fn from_uid(uid: u64, name: impl Into<String>) -> Self {
        Self::new((uid >> 32) as u32, uid as u32, name)
    }

    /// Unique id of the file across restarts of the mining process.
    pub fn uid(&self) -> u64 {
        ((self.sequence as u64) << 32) | self.timestamp as u64
    }
}

impl Display for PlogFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}.{})", self.name, self.sequence, self.timestamp)
    }
}

/// Replicate position: (file unique id, byte offset of the entry).
///
/// Ordered by file id first, byte offset second. Field order matters for the derived `Ord`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct StreamOffset {
    pub file_id: u64,
    pub byte_offset: u64,
}

impl StreamOffset {
    pub fn new(file_id: u64, byte_offset: u64) -> Self {
        Self {
            file_id,
            byte_offset,
        }
    }
}

impl Display for StreamOffset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file_id, self.byte_offset)
    }
}

/// Globally unique record id: file sequence plus the entry sequence within that file.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RecordId {
    pub file: u32,
    pub entry: u32,
}

impl RecordId {
    pub fn new(file: u32, entry: u32) -> Self {
        Self { file, entry }
    }

    pub fn as_u64(&self) -> u64 {
        ((self.file as u64) << 32) | self.entry as u64
    }

    pub fn is_zero(&self) -> bool {
        self.as_u64() == 0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_orders_by_file_first() {
        let a = StreamOffset::new(1, 10_000);
        let b = StreamOffset::new(2, 0);
        let c = StreamOffset::new(2, 16);
        assert!(a < b);
        assert!(b < c);
        assert!(a < c);
        assert!(!(b < a));
        assert_eq!(b.cmp(&b), std::cmp::Ordering::Equal);
    }

    #[test]
    fn test_plog_file_uid() {
        let file = PlogFile::new(42, 1_700_000_000, "42.plog.1700000000");
        let uid = file.uid();
        assert_eq!(uid >> 32, 42);
        assert_eq!(PlogFile::from_uid(uid, file.name.clone()), file);
    }

    #[test]
    fn test_record_id_packing() {
        let id = RecordId::new(3, 7);
        assert_eq!(id.as_u64(), (3 << 32) | 7);
        assert!(RecordId::default().is_zero());
        assert!(RecordId::new(2, u32::MAX) < RecordId::new(3, 0));
    }
}
