use std::sync::Arc;

use fxhash::FxHashMap;
use plog_types::{
    indexmap::IndexMap,
    parking_lot::Mutex,
    types::{ChangeRecord, Column, TransactionSummary},
    offset::StreamOffset,
};

use crate::errors::{Error, Result};

pub mod dictionary;
pub mod schema;

pub use dictionary::Dictionary;
pub use schema::{parse_schema_document, SchemaCache, SchemaChange};

/// In-progress transaction summaries, shared between a cache and all its continuations.
pub type TransactionMap = Arc<Mutex<FxHashMap<String, TransactionSummary>>>;

/// Identity of a row split across several entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartialKey {
    pub key: String,
    pub file: u32,
    pub transaction: Option<String>,
    pub table_id: u32,
}

/// A change record waiting for the rest of its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRecord {
    /// Offset the record is reported at once released.
    pub offset: StreamOffset,
    pub record: ChangeRecord,
}

/// Decoder state carried from one file to the next.
#[derive(Debug, Clone, Default)]
pub struct StreamCache {
    pub dictionary: Dictionary,
    pub schemas: SchemaCache,
    pub partial: IndexMap<PartialKey, PendingRecord>,
    pub current_transaction: Option<String>,
    pub transactions: TransactionMap,
}

impl StreamCache {
    /// Copy for the next file. Dictionary, schemas and partial records are copied, the
    /// transaction map stays shared.
    pub fn continuation(&self) -> Self {
        self.clone()
    }

    /// Empties the per-file maps.
    pub fn clear(&mut self) {
        self.dictionary.clear();
        self.schemas.clear();
        self.partial.clear();
    }

    /// Takes over what a nested stream learned. The nested cache started as a copy of this one.
    pub fn merge_back(&mut self, nested: StreamCache) {
        self.dictionary.merge(nested.dictionary);
        self.schemas.merge(nested.schemas);
        self.partial = nested.partial;
        self.current_transaction = nested.current_transaction;
    }
}

/// How a column list changed between two versions of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evolution {
    Unchanged,
    Extended,
    Truncated,
}

/// Fails when a retained column changed its signature. Placeholders take any definition.
pub fn check_columns(table: &str, cached: &[Column], columns: &[Column]) -> Result<()> {
    for (old, new) in cached.iter().zip(columns) {
        if !old.is_placeholder() && !new.is_placeholder() && old.signature() != new.signature() {
            return Err(Error::IncompatibleDdl {
                table: table.to_string(),
                ordinal: old.id,
                old: format!("{} {}", old.name, old.data_type),
                new: format!("{} {}", new.name, new.data_type),
            });
        }
    }
    Ok(())
}

/// Reconciles a new column list with the cached one.
///
/// Retained columns must keep their signature. Columns added at the end are nullable, and
/// cached columns missing from the new list are kept as nullable trailing columns.
pub fn evolve_columns(
    table: &str,
    cached: &[Column],
    mut columns: Vec<Column>,
) -> Result<(Vec<Column>, Evolution)> {
    check_columns(table, cached, &columns)?;
    for (old, new) in cached.iter().zip(columns.iter_mut()) {
        if new.is_placeholder() {
            *new = old.clone();
        }
    }

    let evolution = match columns.len().cmp(&cached.len()) {
        std::cmp::Ordering::Equal => Evolution::Unchanged,
        std::cmp::Ordering::Greater => {
            for column in &mut columns[cached.len()..] {
                column.nullable = true;
            }
            Evolution::Extended
        }
        std::cmp::Ordering::Less => {
            columns.extend(cached[columns.len()..].iter().cloned().map(|mut column| {
                column.nullable = true;
                column
            }));
            Evolution::Truncated
        }
    };
    Ok((columns, evolution))
}
