use serde::{Deserialize, Serialize};

use crate::{kind::EntryKind, offset::StreamOffset};

mod change;
mod column;
mod field;
mod transaction;

pub use change::{ChangeAction, ChangeHeader, ChangeRecord, ChangeVector, ColumnValue, LobLocation};
pub use column::{
    column_index, column_ordinal, qualified_name, Column, ColumnDataType, SchemaDocument, Table,
};
pub use field::{Field, FieldType};
pub use transaction::TransactionSummary;

/// A decoded record together with the replicate offset it is reported at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub offset: StreamOffset,
    pub data: RecordData,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordData {
    Metadata(SchemaDocument),
    Change(ChangeRecord),
    Vector(ChangeVector),
    Transaction(TransactionSummary),
}

impl DomainRecord {
    pub fn new(offset: StreamOffset, data: RecordData) -> Self {
        Self { offset, data }
    }

    /// Qualified name of the table the record belongs to, if any.
    pub fn schema_name(&self) -> Option<String> {
        match &self.data {
            RecordData::Metadata(document) => Some(document.qualified_name()),
            RecordData::Change(record) => record.header.qualified_name(),
            RecordData::Vector(vector) => vector.header.qualified_name(),
            RecordData::Transaction(_) => None,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match &self.data {
            RecordData::Metadata(_) => EntryKind::Metadata,
            RecordData::Change(record) => action_kind(record.header.action),
            RecordData::Vector(vector) => action_kind(vector.header.action),
            RecordData::Transaction(_) => EntryKind::Commit,
        }
    }

    /// Change records describing table data, the unit included-file statistics count.
    pub fn is_data(&self) -> bool {
        self.kind().is_data_bearing()
    }
}

fn action_kind(action: ChangeAction) -> EntryKind {
    match action {
        ChangeAction::Insert => EntryKind::Insert,
        ChangeAction::Update => EntryKind::Update,
        ChangeAction::Delete => EntryKind::Delete,
        ChangeAction::LobWrite => EntryKind::LobWrite,
        ChangeAction::LobErase => EntryKind::LobErase,
        ChangeAction::LobTrim => EntryKind::LobTrim,
        ChangeAction::Ddl => EntryKind::Ddl,
        ChangeAction::NoOp => EntryKind::NoOp,
        ChangeAction::None => EntryKind::None,
    }
}
