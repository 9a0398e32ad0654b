use plog_types::{
    log::trace,
    offset::StreamOffset,
    types::{ChangeAction, ChangeRecord, ColumnValue, Table},
};

use crate::{
    cache::{PartialKey, PendingRecord, StreamCache},
    errors::{Error, Result},
};

use super::change::unique_key;

/// What became of a change record offered to [`merge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Merged {
    /// Ready to be emitted.
    Emit(ChangeRecord),
    /// A data record with an empty large-object slot, held until the next entry that is not a
    /// large-object write.
    Pending,
    /// A large-object part, cached or folded into a pending record.
    Fragment,
}

/// Pairs data records with the large-object writes that complete them, in either order.
pub fn merge(
    cache: &mut StreamCache,
    offset: StreamOffset,
    mut record: ChangeRecord,
) -> Result<Merged> {
    let key = PartialKey {
        key: unique_key(&record),
        file: record.header.id.file,
        transaction: record.header.transaction_id.clone(),
        table_id: record.header.table_id,
    };

    match record.header.action {
        ChangeAction::LobWrite => {
            if let Some(pending) = cache.partial.get_mut(&key) {
                trace!("Folding large-object write into pending record {}", key.key);
                adopt(&key.key, &mut pending.record, record, false)?;
                pending.record.multi_part = true;
            } else {
                trace!("Caching large-object write for {}", key.key);
                record.multi_part = true;
                record.complete = false;
                cache.partial.insert(key, PendingRecord { offset, record });
            }
            Ok(Merged::Fragment)
        }
        action if action.is_row_change() => {
            let cached_lob = cache
                .partial
                .get(&key)
                .is_some_and(|pending| pending.record.header.action == ChangeAction::LobWrite);
            if cached_lob {
                if let Some(cached) = cache.partial.shift_remove(&key) {
                    adopt(&key.key, &mut record, cached.record, true)?;
                    record.multi_part = true;
                    record.complete = true;
                }
                return Ok(Merged::Emit(record));
            }

            let incomplete = cache
                .dictionary
                .get(record.header.table_id)
                .is_some_and(|table| missing_lob(&record, table));
            if incomplete {
                trace!("Holding {} until its large objects arrive", key.key);
                record.complete = false;
                cache.partial.insert(key, PendingRecord { offset, record });
                return Ok(Merged::Pending);
            }
            Ok(Merged::Emit(record))
        }
        _ => Ok(Merged::Emit(record)),
    }
}

/// Releases held data records. Cached large-object parts stay in the cache.
pub fn release_pending(cache: &mut StreamCache) -> Vec<PendingRecord> {
    let (released, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut cache.partial)
        .into_iter()
        .partition(|(_, pending)| pending.record.header.action.is_row_change());
    cache.partial = kept.into_iter().collect();
    released
        .into_iter()
        .map(|(_, mut pending)| {
            pending.record.complete = true;
            pending
        })
        .collect()
}

fn missing_lob(record: &ChangeRecord, table: &Table) -> bool {
    table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, column)| column.data_type.is_lob())
        .any(|(index, _)| match record.columns.get(index) {
            Some(Some(value)) => value.value.is_null(),
            _ => true,
        })
}

/// Moves the values of `from` into the empty or null slots of `into`.
///
/// Two large-object writes of the same row fold newest-wins.
fn adopt(key: &str, into: &mut ChangeRecord, from: ChangeRecord, from_cache: bool) -> Result<()> {
    let overwrite = into.header.action == ChangeAction::LobWrite
        && from.header.action == ChangeAction::LobWrite;
    for (index, value) in from.columns.into_iter().enumerate() {
        let Some(value) = value else {
            continue;
        };
        if into.columns.len() <= index {
            into.columns.resize(index + 1, None);
        }
        match &mut into.columns[index] {
            slot @ None => *slot = Some(value),
            Some(existing) if existing.value.is_null() || overwrite => {
                if existing.name != value.name || existing.data_type != value.data_type {
                    let (cached, current) = if from_cache {
                        (&value, &*existing)
                    } else {
                        (&*existing, &value)
                    };
                    return Err(Error::MergeMismatch {
                        key: key.to_string(),
                        ordinal: value.id,
                        cached: describe(cached),
                        current: describe(current),
                    });
                }
                existing.is_supplemental_key |= value.is_supplemental_key;
                existing.value = value.value;
                if value.lob.is_some() {
                    existing.lob = value.lob;
                }
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn describe(value: &ColumnValue) -> String {
    format!("{} {}", value.name, value.data_type)
}

#[cfg(test)]
mod tests {
    use plog_types::{
        offset::RecordId,
        types::{ChangeHeader, Column, ColumnDataType, Field},
    };

    use super::*;

    fn emp_table() -> Table {
        let mut id = Column::new(1, "ID", ColumnDataType::Number);
        id.is_key = true;
        Table::new(
            5,
            "APP",
            "DOCS",
            vec![id, Column::new(2, "BODY", ColumnDataType::Clob)],
        )
    }

    fn cache() -> StreamCache {
        let mut cache = StreamCache::default();
        cache.dictionary.apply(emp_table()).unwrap();
        cache
    }

    fn value(id: u32, name: &str, data_type: ColumnDataType, value: Field) -> Option<ColumnValue> {
        Some(ColumnValue {
            id,
            name: name.to_string(),
            data_type,
            value,
            lob: None,
            is_supplemental_key: false,
            is_key: id == 1,
        })
    }

    fn record(action: ChangeAction, body: Option<ColumnValue>) -> ChangeRecord {
        ChangeRecord {
            header: ChangeHeader {
                action,
                id: RecordId::new(1, 2),
                transaction_id: Some("1.2.3".to_string()),
                table_id: 5,
                owner: "APP".to_string(),
                table_name: "DOCS".to_string(),
                ..Default::default()
            },
            columns: vec![value(1, "ID", ColumnDataType::Number, Field::Int(1)), body],
            multi_part: false,
            complete: true,
        }
    }

    fn body(text: &str) -> Option<ColumnValue> {
        value(2, "BODY", ColumnDataType::Clob, Field::String(text.to_string()))
    }

    #[test]
    fn test_lob_write_then_insert() {
        let mut cache = cache();
        let offset = StreamOffset::new(1, 100);
        assert_eq!(
            merge(&mut cache, offset, record(ChangeAction::LobWrite, body("hello"))).unwrap(),
            Merged::Fragment
        );
        assert_eq!(cache.partial.len(), 1);

        let Merged::Emit(merged) = merge(&mut cache, offset, record(ChangeAction::Insert, None)).unwrap() else {
            panic!("insert should complete the row");
        };
        assert!(merged.multi_part && merged.complete);
        assert_eq!(merged.value(2), Some(&Field::String("hello".to_string())));
        assert!(cache.partial.is_empty());
    }

    #[test]
    fn test_insert_then_lob_write() {
        let mut cache = cache();
        let offset = StreamOffset::new(1, 100);
        let null_body = value(2, "BODY", ColumnDataType::Clob, Field::Null);
        assert_eq!(
            merge(&mut cache, offset, record(ChangeAction::Insert, null_body)).unwrap(),
            Merged::Pending
        );
        assert_eq!(
            merge(&mut cache, StreamOffset::new(1, 200), record(ChangeAction::LobWrite, body("hi")))
                .unwrap(),
            Merged::Fragment
        );

        let released = release_pending(&mut cache);
        assert_eq!(released.len(), 1);
        let pending = &released[0];
        assert_eq!(pending.offset, offset);
        assert!(pending.record.multi_part && pending.record.complete);
        assert_eq!(pending.record.value(2), Some(&Field::String("hi".to_string())));
        assert!(cache.partial.is_empty());
    }

    #[test]
    fn test_release_keeps_lob_parts() {
        let mut cache = cache();
        let offset = StreamOffset::default();
        merge(&mut cache, offset, record(ChangeAction::LobWrite, body("x"))).unwrap();
        assert!(release_pending(&mut cache).is_empty());
        assert_eq!(cache.partial.len(), 1);
    }

    #[test]
    fn test_different_transaction_does_not_merge() {
        let mut cache = cache();
        let offset = StreamOffset::default();
        merge(&mut cache, offset, record(ChangeAction::LobWrite, body("x"))).unwrap();
        let mut insert = record(ChangeAction::Insert, body("y"));
        insert.header.transaction_id = Some("9.9.9".to_string());
        let Merged::Emit(insert) = merge(&mut cache, offset, insert).unwrap() else {
            panic!("complete insert should be emitted");
        };
        assert!(!insert.multi_part);
        assert_eq!(cache.partial.len(), 1);
    }

    #[test]
    fn test_type_mismatch_is_fatal() {
        let mut cache = cache();
        let offset = StreamOffset::default();
        merge(&mut cache, offset, record(ChangeAction::LobWrite, body("x"))).unwrap();
        let wrong = value(2, "BODY", ColumnDataType::Blob, Field::Null);
        assert!(matches!(
            merge(&mut cache, offset, record(ChangeAction::Insert, wrong)),
            Err(Error::MergeMismatch { ordinal: 2, .. })
        ));
    }
}
