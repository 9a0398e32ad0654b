use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Logical meaning of a PLOG entry, derived from its (major type, subtype) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    Header,
    Footer,
    Metadata,
    Insert,
    Update,
    Delete,
    LobWrite,
    LobErase,
    LobTrim,
    Ddl,
    NoOp,
    Commit,
    IncludeFile,
    IncludeStats,
    /// Unknown (major type, subtype) combination. Skipped by the decoder.
    None,
}

impl EntryKind {
    /// Entries describing a change to table data.
    pub fn is_data_bearing(&self) -> bool {
        matches!(
            self,
            EntryKind::Insert
                | EntryKind::Update
                | EntryKind::Delete
                | EntryKind::LobWrite
                | EntryKind::LobErase
                | EntryKind::LobTrim
        )
    }

    /// Entries that are assembled into change records or vectors.
    pub fn is_change(&self) -> bool {
        self.is_data_bearing() || matches!(self, EntryKind::Ddl | EntryKind::NoOp)
    }

    /// Entries that may carry a transaction id.
    pub fn is_transactional(&self) -> bool {
        self.is_change() || matches!(self, EntryKind::Commit)
    }
}

impl Display for EntryKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntryKind::Header => "HEADER",
            EntryKind::Footer => "FOOTER",
            EntryKind::Metadata => "METADATA",
            EntryKind::Insert => "INSERT",
            EntryKind::Update => "UPDATE",
            EntryKind::Delete => "DELETE",
            EntryKind::LobWrite => "LOB_WRITE",
            EntryKind::LobErase => "LOB_ERASE",
            EntryKind::LobTrim => "LOB_TRIM",
            EntryKind::Ddl => "DDL",
            EntryKind::NoOp => "NO_OP",
            EntryKind::Commit => "COMMIT",
            EntryKind::IncludeFile => "INCLUDE_FILE",
            EntryKind::IncludeStats => "INCLUDE_STATS",
            EntryKind::None => "NONE",
        };
        f.write_str(name)
    }
}
