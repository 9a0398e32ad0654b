use fxhash::FxHashMap;
use plog_types::types::{column_index, Table};

use crate::errors::Result;

use super::{check_columns, evolve_columns, Evolution};

/// Compact table definitions by table id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    tables: FxHashMap<u32, Table>,
}

impl Dictionary {
    pub fn get(&self, table_id: u32) -> Option<&Table> {
        self.tables.get(&table_id)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Inserts or evolves a table definition. Returns whether the cached entry changed.
    ///
    /// An incompatible definition leaves the dictionary untouched.
    pub fn apply(&mut self, table: Table) -> Result<bool> {
        let Some(cached) = self.tables.get(&table.id) else {
            self.tables.insert(table.id, table);
            return Ok(true);
        };

        let (columns, evolution) =
            evolve_columns(&table.qualified_name(), &cached.columns, table.columns)?;
        if evolution == Evolution::Unchanged
            && columns == cached.columns
            && cached.owner == table.owner
            && cached.name == table.name
        {
            return Ok(false);
        }
        let table = Table::new(table.id, table.owner, table.name, columns);
        self.tables.insert(table.id, table);
        Ok(true)
    }

    /// Fails when [`Dictionary::apply`] would reject the table.
    pub fn check(&self, table: &Table) -> Result<()> {
        match self.tables.get(&table.id) {
            Some(cached) => {
                check_columns(&table.qualified_name(), &cached.columns, &table.columns)
            }
            None => Ok(()),
        }
    }

    /// Flags columns as key columns after the fact.
    pub fn mark_key_columns(&mut self, table_id: u32, ordinals: &[u32]) {
        if let Some(table) = self.tables.get_mut(&table_id) {
            for ordinal in ordinals {
                if let Some(column) = column_index(*ordinal).and_then(|i| table.columns.get_mut(i))
                {
                    column.is_key = true;
                }
            }
            table.has_key = table.columns.iter().any(|column| column.is_key);
        }
    }

    pub fn merge(&mut self, other: Dictionary) {
        self.tables.extend(other.tables);
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }
}
