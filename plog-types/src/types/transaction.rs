use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::offset::{RecordId, StreamOffset};

/// Aggregate statistics of all entries sharing a transaction id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub id: String,
    pub start_file_id: u64,
    pub end_file_id: u64,
    pub start_scn: u64,
    pub end_scn: u64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub start_record_id: RecordId,
    pub end_record_id: RecordId,
    pub record_count: u64,
    /// Record count per qualified table name.
    pub schema_counts: BTreeMap<String, u64>,
    /// Raw encoded size of the entries, in bytes.
    pub size: u64,
    /// Offset of the last entry observed for this transaction.
    pub last_offset: StreamOffset,
}

impl TransactionSummary {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.id.is_empty()
            && self.start_time.is_some()
            && self.end_time.is_some()
            && self.start_scn != 0
            && self.end_scn != 0
            && !self.start_record_id.is_zero()
            && !self.end_record_id.is_zero()
            && self.record_count > 0
    }
}
