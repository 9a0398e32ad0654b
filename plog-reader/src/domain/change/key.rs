use plog_types::types::ChangeRecord;

/// Identity of the row a change record touches, used to pair record parts.
///
/// Updates and deletes are identified by their supplemental key columns, every other change by
/// all of its non-null columns. Large-object columns never take part.
pub fn unique_key(record: &ChangeRecord) -> String {
    let supplemental_only = record.header.action.keyed_by_supplemental_key();
    record
        .columns
        .iter()
        .flatten()
        .filter(|column| !column.value.is_null() && !column.data_type.is_lob())
        .filter(|column| !supplemental_only || column.is_supplemental_key)
        .map(|column| format!("{}:{}", column.id, column.value))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use plog_types::types::{ChangeAction, ChangeHeader, ColumnDataType, ColumnValue, Field};

    use super::*;

    fn value(id: u32, data_type: ColumnDataType, value: Field, supplemental: bool) -> ColumnValue {
        ColumnValue {
            id,
            name: format!("C{id}"),
            data_type,
            value,
            lob: None,
            is_supplemental_key: supplemental,
            is_key: false,
        }
    }

    fn record(action: ChangeAction) -> ChangeRecord {
        ChangeRecord {
            header: ChangeHeader {
                action,
                ..Default::default()
            },
            columns: vec![
                Some(value(1, ColumnDataType::Number, Field::Int(7), true)),
                Some(value(2, ColumnDataType::Varchar, Field::String("X".into()), false)),
                Some(value(3, ColumnDataType::Clob, Field::String("doc".into()), false)),
                Some(value(4, ColumnDataType::Varchar, Field::Null, false)),
                None,
            ],
            multi_part: false,
            complete: true,
        }
    }

    #[test]
    fn test_insert_key_uses_all_plain_columns() {
        assert_eq!(unique_key(&record(ChangeAction::Insert)), "1:7,2:X");
        assert_eq!(unique_key(&record(ChangeAction::LobWrite)), "1:7,2:X");
    }

    #[test]
    fn test_update_key_uses_supplemental_columns() {
        assert_eq!(unique_key(&record(ChangeAction::Update)), "1:7");
        assert_eq!(unique_key(&record(ChangeAction::Delete)), "1:7");
    }

    #[test]
    fn test_key_is_deterministic() {
        let a = record(ChangeAction::Insert);
        let mut b = a.clone();
        b.header.scn = 42;
        assert_eq!(unique_key(&a), unique_key(&b));
        b.columns[1] = None;
        assert_eq!(unique_key(&b), "1:7");
    }
}
