use plog_types::kind::EntryKind;

pub const ETYPE_CONTROL: u32 = 0;
pub const ETYPE_METADATA: u32 = 1;
pub const ETYPE_LCR: u32 = 2;
pub const ETYPE_TRANSACTION: u32 = 3;

pub const ESTYPE_HEADER: u32 = 0;
pub const ESTYPE_FOOTER: u32 = 1;

pub const ESTYPE_DDL_JSON: u32 = 0;

pub const ESTYPE_LCR_INSERT: u32 = 1;
pub const ESTYPE_LCR_UPDATE: u32 = 2;
pub const ESTYPE_LCR_DELETE: u32 = 3;
pub const ESTYPE_LCR_LOB_WRITE: u32 = 4;
pub const ESTYPE_LCR_LOB_ERASE: u32 = 5;
pub const ESTYPE_LCR_LOB_TRIM: u32 = 6;
pub const ESTYPE_LCR_DDL: u32 = 7;
pub const ESTYPE_LCR_NOOP: u32 = 8;
pub const ESTYPE_LCR_INCLUDE_FILE: u32 = 9;
pub const ESTYPE_LCR_INCLUDE_STATS: u32 = 10;

pub const ESTYPE_COMMIT: u32 = 0;

/// Maps a (major type, subtype) pair onto its logical meaning.
///
/// Unknown pairs map to [`EntryKind::None`] so newer writers don't break older readers.
pub fn classify(major: u32, subtype: u32) -> EntryKind {
    match (major, subtype) {
        (ETYPE_CONTROL, ESTYPE_HEADER) => EntryKind::Header,
        (ETYPE_CONTROL, ESTYPE_FOOTER) => EntryKind::Footer,
        (ETYPE_METADATA, ESTYPE_DDL_JSON) => EntryKind::Metadata,
        (ETYPE_LCR, ESTYPE_LCR_INSERT) => EntryKind::Insert,
        (ETYPE_LCR, ESTYPE_LCR_UPDATE) => EntryKind::Update,
        (ETYPE_LCR, ESTYPE_LCR_DELETE) => EntryKind::Delete,
        (ETYPE_LCR, ESTYPE_LCR_LOB_WRITE) => EntryKind::LobWrite,
        (ETYPE_LCR, ESTYPE_LCR_LOB_ERASE) => EntryKind::LobErase,
        (ETYPE_LCR, ESTYPE_LCR_LOB_TRIM) => EntryKind::LobTrim,
        (ETYPE_LCR, ESTYPE_LCR_DDL) => EntryKind::Ddl,
        (ETYPE_LCR, ESTYPE_LCR_NOOP) => EntryKind::NoOp,
        (ETYPE_LCR, ESTYPE_LCR_INCLUDE_FILE) => EntryKind::IncludeFile,
        (ETYPE_LCR, ESTYPE_LCR_INCLUDE_STATS) => EntryKind::IncludeStats,
        (ETYPE_TRANSACTION, ESTYPE_COMMIT) => EntryKind::Commit,
        _ => EntryKind::None,
    }
}

/// Inverse of [`classify`], used when writing entries.
pub fn entry_type(kind: EntryKind) -> Option<(u32, u32)> {
    Some(match kind {
        EntryKind::Header => (ETYPE_CONTROL, ESTYPE_HEADER),
        EntryKind::Footer => (ETYPE_CONTROL, ESTYPE_FOOTER),
        EntryKind::Metadata => (ETYPE_METADATA, ESTYPE_DDL_JSON),
        EntryKind::Insert => (ETYPE_LCR, ESTYPE_LCR_INSERT),
        EntryKind::Update => (ETYPE_LCR, ESTYPE_LCR_UPDATE),
        EntryKind::Delete => (ETYPE_LCR, ESTYPE_LCR_DELETE),
        EntryKind::LobWrite => (ETYPE_LCR, ESTYPE_LCR_LOB_WRITE),
        EntryKind::LobErase => (ETYPE_LCR, ESTYPE_LCR_LOB_ERASE),
        EntryKind::LobTrim => (ETYPE_LCR, ESTYPE_LCR_LOB_TRIM),
        EntryKind::Ddl => (ETYPE_LCR, ESTYPE_LCR_DDL),
        EntryKind::NoOp => (ETYPE_LCR, ESTYPE_LCR_NOOP),
        EntryKind::IncludeFile => (ETYPE_LCR, ESTYPE_LCR_INCLUDE_FILE),
        EntryKind::IncludeStats => (ETYPE_LCR, ESTYPE_LCR_INCLUDE_STATS),
        EntryKind::Commit => (ETYPE_TRANSACTION, ESTYPE_COMMIT),
        EntryKind::None => return None,
    })
}
