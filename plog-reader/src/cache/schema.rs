use fxhash::FxHashMap;
use plog_types::{
    serde::Deserialize,
    serde_json,
    types::{column_index, column_ordinal, Column, ColumnDataType, SchemaDocument},
};

use crate::errors::{Error, Result};

use super::{check_columns, evolve_columns, Evolution};

#[derive(Debug, Deserialize)]
#[serde(crate = "plog_types::serde", rename_all = "camelCase")]
struct SchemaDocumentJson {
    owner: String,
    name: String,
    object_id: Option<u32>,
    #[serde(default)]
    valid_since: u64,
    columns: Vec<ColumnJson>,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "plog_types::serde", rename_all = "camelCase")]
struct ColumnJson {
    column_id: u32,
    column_name: String,
    data_type: String,
    data_precision: Option<i32>,
    data_scale: Option<i32>,
    nullable: Option<bool>,
    primary_key: Option<bool>,
}

/// Parses the JSON schema document carried by metadata entries.
///
/// The virtual column (ordinal 0) is dropped. Remaining ordinals must run from 1 without gaps.
pub fn parse_schema_document(json: &str) -> Result<SchemaDocument> {
    let document: SchemaDocumentJson = serde_json::from_str(json)?;
    let table = format!("{}.{}", document.owner, document.name);

    let mut columns: Vec<ColumnJson> = document
        .columns
        .into_iter()
        .filter(|column| column.column_id != 0)
        .collect();
    columns.sort_by_key(|column| column.column_id);

    let has_key_flags = columns.iter().all(|column| column.primary_key.is_some());
    let columns = columns
        .into_iter()
        .enumerate()
        .map(|(index, column)| {
            if column_index(column.column_id) != Some(index) {
                return Err(Error::InvalidSchemaDocument {
                    table: table.clone(),
                    reason: format!(
                        "expected column {}, found {}",
                        column_ordinal(index),
                        column.column_id
                    ),
                });
            }
            Ok(Column {
                id: column.column_id,
                name: column.column_name,
                data_type: ColumnDataType::from_name(&column.data_type),
                precision: column.data_precision.unwrap_or(0),
                scale: column.data_scale.unwrap_or(0),
                nullable: column.nullable.unwrap_or(true),
                is_key: column.primary_key.unwrap_or(false),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SchemaDocument {
        owner: document.owner,
        name: document.name,
        object_id: document.object_id,
        columns,
        valid_since: document.valid_since,
        has_key_flags,
    })
}

/// Outcome of [`SchemaCache::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaChange {
    Created,
    /// Not newer than the cached version, ignored.
    Stale,
    Extended,
    Truncated,
    Replaced,
}

/// Full schema documents by qualified table name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaCache {
    documents: FxHashMap<String, SchemaDocument>,
}

impl SchemaCache {
    pub fn get(&self, qualified_name: &str) -> Option<&SchemaDocument> {
        self.documents.get(qualified_name)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Applies a new version of a document. An incompatible version leaves the cache untouched.
    pub fn apply(&mut self, document: SchemaDocument) -> Result<SchemaChange> {
        let name = document.qualified_name();
        let Some(cached) = self.documents.get(&name) else {
            self.documents.insert(name, document);
            return Ok(SchemaChange::Created);
        };
        if document.valid_since <= cached.valid_since {
            return Ok(SchemaChange::Stale);
        }

        let (columns, evolution) = evolve_columns(&name, &cached.columns, document.columns)?;
        let change = match evolution {
            Evolution::Unchanged => SchemaChange::Replaced,
            Evolution::Extended => SchemaChange::Extended,
            Evolution::Truncated => SchemaChange::Truncated,
        };
        self.documents.insert(
            name,
            SchemaDocument {
                columns,
                ..document
            },
        );
        Ok(change)
    }

    /// Fails when [`SchemaCache::apply`] would reject the document.
    pub fn check(&self, document: &SchemaDocument) -> Result<()> {
        let name = document.qualified_name();
        match self.documents.get(&name) {
            Some(cached) if document.valid_since > cached.valid_since => {
                check_columns(&name, &cached.columns, &document.columns)
            }
            _ => Ok(()),
        }
    }

    /// Flags columns as key columns after the fact.
    pub fn mark_key_columns(&mut self, qualified_name: &str, ordinals: &[u32]) {
        if let Some(document) = self.documents.get_mut(qualified_name) {
            for ordinal in ordinals {
                if let Some(column) =
                    column_index(*ordinal).and_then(|i| document.columns.get_mut(i))
                {
                    column.is_key = true;
                }
            }
        }
    }

    /// Keeps the newer version of every document.
    pub fn merge(&mut self, other: SchemaCache) {
        for (name, document) in other.documents {
            match self.documents.get(&name) {
                Some(cached) if cached.valid_since > document.valid_since => {}
                _ => {
                    self.documents.insert(name, document);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.documents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMP_V1: &str = r#"{
        "owner": "SCOTT",
        "name": "EMP",
        "objectId": 73181,
        "validSince": 100,
        "columns": [
            {"columnId": 0, "columnName": "SYS_ROWID", "dataType": "ROWID"},
            {"columnId": 1, "columnName": "EMPNO", "dataType": "NUMBER", "dataPrecision": 4, "dataScale": 0, "nullable": false, "primaryKey": true},
            {"columnId": 2, "columnName": "ENAME", "dataType": "VARCHAR2", "dataPrecision": 10, "primaryKey": false}
        ]
    }"#;

    fn emp(valid_since: u64, columns: &[(&str, &str)]) -> SchemaDocument {
        let columns = columns
            .iter()
            .enumerate()
            .map(|(i, (name, data_type))| {
                format!(
                    r#"{{"columnId": {}, "columnName": "{}", "dataType": "{}"}}"#,
                    i + 1,
                    name,
                    data_type
                )
            })
            .collect::<Vec<_>>()
            .join(",");
        parse_schema_document(&format!(
            r#"{{"owner": "SCOTT", "name": "EMP", "validSince": {}, "columns": [{}]}}"#,
            valid_since, columns
        ))
        .unwrap()
    }

    #[test]
    fn test_parse_document() {
        let document = parse_schema_document(EMP_V1).unwrap();
        assert_eq!(document.qualified_name(), "SCOTT.EMP");
        assert_eq!(document.object_id, Some(73181));
        assert_eq!(document.columns.len(), 2);
        assert!(document.has_key_flags);
        let empno = &document.columns[0];
        assert_eq!(empno.id, 1);
        assert_eq!(empno.type_spec(), "NUMBER(4,0)");
        assert!(empno.is_key && !empno.nullable);
        assert_eq!(document.to_table().unwrap().id, 73181);
    }

    #[test]
    fn test_missing_key_flags() {
        let document = emp(1, &[("EMPNO", "NUMBER")]);
        assert!(!document.has_key_flags);
        assert_eq!(document.to_table(), None);
    }

    #[test]
    fn test_gap_in_ordinals_is_rejected() {
        let json = r#"{"owner": "S", "name": "T", "columns": [
            {"columnId": 1, "columnName": "A", "dataType": "NUMBER"},
            {"columnId": 3, "columnName": "C", "dataType": "NUMBER"}
        ]}"#;
        assert!(matches!(
            parse_schema_document(json),
            Err(Error::InvalidSchemaDocument { .. })
        ));
        assert!(matches!(
            parse_schema_document("{"),
            Err(Error::SchemaDocument(_))
        ));
    }

    #[test]
    fn test_apply_evolution() {
        let mut cache = SchemaCache::default();
        assert_eq!(
            cache.apply(emp(10, &[("EMPNO", "NUMBER")])).unwrap(),
            SchemaChange::Created
        );
        assert_eq!(
            cache.apply(emp(10, &[("EMPNO", "NUMBER")])).unwrap(),
            SchemaChange::Stale
        );
        assert_eq!(
            cache
                .apply(emp(20, &[("EMPNO", "NUMBER"), ("ENAME", "VARCHAR2")]))
                .unwrap(),
            SchemaChange::Extended
        );
        assert_eq!(
            cache.apply(emp(30, &[("EMPNO", "NUMBER")])).unwrap(),
            SchemaChange::Truncated
        );
        let cached = cache.get("SCOTT.EMP").unwrap();
        assert_eq!(cached.columns.len(), 2);
        assert!(cached.columns[1].nullable);
        assert_eq!(cached.valid_since, 30);
        assert_eq!(
            cache.apply(emp(40, &[("EMPNO", "NUMBER"), ("ENAME", "VARCHAR2")])).unwrap(),
            SchemaChange::Replaced
        );
    }

    #[test]
    fn test_incompatible_document_leaves_cache_unchanged() {
        let mut cache = SchemaCache::default();
        cache.apply(emp(10, &[("EMPNO", "NUMBER")])).unwrap();
        let before = cache.clone();
        assert!(matches!(
            cache.apply(emp(20, &[("EMPNO", "DATE")])),
            Err(Error::IncompatibleDdl { .. })
        ));
        assert_eq!(cache, before);
    }
}
