use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{kind::EntryKind, offset::RecordId};

use super::{
    column::{qualified_name, ColumnDataType},
    field::Field,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
    LobWrite,
    LobErase,
    LobTrim,
    Ddl,
    NoOp,
    #[default]
    None,
}

impl ChangeAction {
    pub fn from_kind(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Insert => ChangeAction::Insert,
            EntryKind::Update => ChangeAction::Update,
            EntryKind::Delete => ChangeAction::Delete,
            EntryKind::LobWrite => ChangeAction::LobWrite,
            EntryKind::LobErase => ChangeAction::LobErase,
            EntryKind::LobTrim => ChangeAction::LobTrim,
            EntryKind::Ddl => ChangeAction::Ddl,
            EntryKind::NoOp => ChangeAction::NoOp,
            _ => ChangeAction::None,
        }
    }

    /// Update and delete records are identified by their supplemental key columns only.
    pub fn keyed_by_supplemental_key(&self) -> bool {
        matches!(self, ChangeAction::Update | ChangeAction::Delete)
    }

    pub fn is_row_change(&self) -> bool {
        matches!(
            self,
            ChangeAction::Insert | ChangeAction::Update | ChangeAction::Delete
        )
    }
}

/// Out-of-band placement of a large object piece.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobLocation {
    pub offset: u64,
    pub length: u64,
    pub position: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnValue {
    /// 1-based ordinal.
    pub id: u32,
    pub name: String,
    pub data_type: ColumnDataType,
    pub value: Field,
    pub lob: Option<LobLocation>,
    pub is_supplemental_key: bool,
    pub is_key: bool,
}

/// Fields shared by the row view and the vector view of a change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeHeader {
    pub action: ChangeAction,
    pub id: RecordId,
    pub transaction_id: Option<String>,
    /// System change number of the change.
    pub scn: u64,
    pub timestamp: Option<DateTime<Utc>>,
    pub table_id: u32,
    pub owner: String,
    pub table_name: String,
    /// Statement text of DDL changes.
    pub statement: Option<String>,
}

impl ChangeHeader {
    /// `None` for changes that are not bound to a table.
    pub fn qualified_name(&self) -> Option<String> {
        if self.owner.is_empty() && self.table_name.is_empty() {
            None
        } else {
            Some(qualified_name(&self.owner, &self.table_name))
        }
    }
}

/// Row view of a change: one slot per dictionary column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    #[serde(flatten)]
    pub header: ChangeHeader,
    pub columns: Vec<Option<ColumnValue>>,
    /// Assembled from more than one entry.
    pub multi_part: bool,
    pub complete: bool,
}

impl ChangeRecord {
    pub fn column(&self, ordinal: u32) -> Option<&ColumnValue> {
        super::column::column_index(ordinal)
            .and_then(|index| self.columns.get(index))
            .and_then(Option::as_ref)
    }

    pub fn value(&self, ordinal: u32) -> Option<&Field> {
        self.column(ordinal).map(|column| &column.value)
    }
}

/// Vector view of a change: the encoded images kept apart.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeVector {
    #[serde(flatten)]
    pub header: ChangeHeader,
    pub key: Vec<ColumnValue>,
    pub old: Vec<ColumnValue>,
    pub new: Vec<ColumnValue>,
    pub lob: Vec<ColumnValue>,
}
