use plog_types::{
    chrono::{TimeZone, Utc},
    log::{trace, warn},
    models::stream::ChangeView,
    types::{
        column_index, column_ordinal, qualified_name, ChangeAction, ChangeHeader, ChangeRecord,
        Column, ColumnValue, Field, RecordData, Table,
    },
};

use crate::{
    cache::{Dictionary, StreamCache},
    decode::{decode_value, TypeSpecParser},
    errors::{Error, Result},
    format::{
        entry::EntryRecord,
        tag::{TagRecord, TagType},
    },
};

use super::{DecodeContext, EntryDecoder};

mod key;
mod vector;

pub use key::unique_key;

const VALUE_TAGS: [TagType; 7] = [
    TagType::KeyImage,
    TagType::OldImage,
    TagType::NewImage,
    TagType::LobData,
    TagType::LobOffset,
    TagType::LobLength,
    TagType::LobPosition,
];

/// A value or large-object location tag and the ordinal of the column it belongs to.
#[derive(Debug, Clone, Copy)]
struct Image<'a> {
    ordinal: u32,
    tag: &'a TagRecord,
}

/// Assembles change entries into row or vector records.
#[derive(Debug, Clone, Default)]
pub struct ChangeAssembler {
    types: TypeSpecParser,
}

impl EntryDecoder for ChangeAssembler {
    fn decode(
        &self,
        entry: &EntryRecord,
        context: &mut DecodeContext<'_>,
    ) -> Result<Option<RecordData>> {
        let table_id = entry.u32_tag(TagType::ObjectId)?.unwrap_or_default();
        let ordinals = entry
            .tags(TagType::ColumnId)
            .iter()
            .map(TagRecord::as_u32)
            .collect::<Result<Vec<_>>>()?;
        if entry.has(TagType::ColumnName) || entry.has(TagType::ColumnType) {
            self.learn_inline_columns(entry, table_id, &ordinals, context.cache)?;
        }

        let table = context.cache.dictionary.get(table_id);
        if table.is_none() && !ordinals.is_empty() {
            return Err(Error::MissingSchema(table_id));
        }
        let header = ChangeHeader {
            action: ChangeAction::from_kind(entry.kind),
            id: context.record_id,
            transaction_id: entry.str_tag(TagType::Xid)?,
            scn: entry.u64_tag(TagType::Scn)?.unwrap_or_default(),
            timestamp: entry
                .u64_tag(TagType::Timestamp)?
                .and_then(|seconds| Utc.timestamp_opt(seconds as i64, 0).single()),
            table_id,
            owner: match entry.str_tag(TagType::ObjectOwner)? {
                Some(owner) => owner,
                None => table.map(|table| table.owner.clone()).unwrap_or_default(),
            },
            table_name: match entry.str_tag(TagType::ObjectName)? {
                Some(name) => name,
                None => table.map(|table| table.name.clone()).unwrap_or_default(),
            },
            statement: entry.str_tag(TagType::DdlSql)?,
        };
        let Some(table) = table else {
            return Ok(Some(match context.config.view {
                ChangeView::Row => RecordData::Change(ChangeRecord {
                    header,
                    complete: true,
                    ..Default::default()
                }),
                ChangeView::Vector => RecordData::Vector(vector::empty(header)),
            }));
        };

        let images = images(entry, &ordinals)?;
        let mut data = match context.config.view {
            ChangeView::Row => RecordData::Change(assemble_row(header, table, &images)?),
            ChangeView::Vector => RecordData::Vector(vector::assemble(header, table, &images)?),
        };
        retrofit_key_columns(&mut data, context.cache);
        Ok(Some(data))
    }
}

impl ChangeAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the dictionary entry from inline column name and type tags.
    fn learn_inline_columns(
        &self,
        entry: &EntryRecord,
        table_id: u32,
        ordinals: &[u32],
        cache: &mut StreamCache,
    ) -> Result<()> {
        let names = entry.tags(TagType::ColumnName);
        let types = entry.tags(TagType::ColumnType);
        if names.len() != ordinals.len() || types.len() != ordinals.len() {
            return Err(Error::TagCountMismatch {
                table_id,
                column_ids: ordinals.len(),
                names: names.len(),
                types: types.len(),
            });
        }

        let existing = cache.dictionary.get(table_id);
        let owner = match entry.str_tag(TagType::ObjectOwner)? {
            Some(owner) => owner,
            None => existing.map(|table| table.owner.clone()).unwrap_or_default(),
        };
        let name = match entry.str_tag(TagType::ObjectName)? {
            Some(name) => name,
            None => existing.map(|table| table.name.clone()).unwrap_or_default(),
        };
        let mut columns = existing
            .map(|table| table.columns.clone())
            .unwrap_or_default();

        let mut inline = ordinals
            .iter()
            .zip(names.iter().zip(types))
            .map(|(ordinal, (name, spec))| Ok((*ordinal, name.as_str()?, spec.as_str()?)))
            .collect::<Result<Vec<_>>>()?;
        inline.sort_by_key(|(ordinal, ..)| *ordinal);

        for (ordinal, column_name, spec) in inline {
            let Some(index) = column_index(ordinal) else {
                continue;
            };
            let mut column = self.types.parse(&spec).column(ordinal, column_name);
            match index.cmp(&columns.len()) {
                std::cmp::Ordering::Less => {
                    let cached = &columns[index];
                    if cached.signature() == column.signature() {
                        column.is_key = cached.is_key;
                        column.nullable = cached.nullable;
                    }
                    columns[index] = column;
                }
                std::cmp::Ordering::Equal => columns.push(column),
                std::cmp::Ordering::Greater => {
                    trace!(
                        "Inline column {} of table {} leaves columns {}..{} undescribed",
                        ordinal,
                        table_id,
                        columns.len() + 1,
                        ordinal
                    );
                    let gap = columns.len()..index;
                    columns.extend(gap.map(|i| Column::placeholder(column_ordinal(i))));
                    columns.push(column);
                }
            }
        }

        cache
            .dictionary
            .apply(Table::new(table_id, owner, name, columns))?;
        Ok(())
    }
}

/// Qualified name of the table an entry refers to, from inline tags or the dictionary.
pub fn entry_schema(entry: &EntryRecord, dictionary: &Dictionary) -> Result<Option<String>> {
    if let (Some(owner), Some(name)) = (
        entry.str_tag(TagType::ObjectOwner)?,
        entry.str_tag(TagType::ObjectName)?,
    ) {
        return Ok(Some(qualified_name(&owner, &name)));
    }
    Ok(entry
        .u32_tag(TagType::ObjectId)?
        .and_then(|id| dictionary.get(id))
        .map(Table::qualified_name))
}

/// Pairs value tags with their column, in encoded order.
///
/// A value tag belongs to the nearest column id tag before it.
fn images<'a>(entry: &'a EntryRecord, ordinals: &[u32]) -> Result<Vec<Image<'a>>> {
    let columns = entry.tags(TagType::ColumnId);
    let mut tags: Vec<&TagRecord> = VALUE_TAGS
        .iter()
        .flat_map(|tag_type| entry.tags(*tag_type))
        .collect();
    tags.sort_by_key(|tag| tag.seq);

    tags.into_iter()
        .map(|tag| {
            let owner = columns.partition_point(|column| column.seq < tag.seq);
            if owner == 0 {
                return Err(Error::MalformedTag {
                    id: tag.id,
                    reason: "value precedes any column id".to_string(),
                });
            }
            Ok(Image {
                ordinal: ordinals[owner - 1],
                tag,
            })
        })
        .collect()
}

/// Dictionary column an image belongs to, if it has a slot.
fn image_column<'a>(table: &'a Table, image: &Image<'_>) -> Option<(usize, &'a Column)> {
    let Some(index) = column_index(image.ordinal) else {
        trace!("Skipping virtual column of {}", table.qualified_name());
        return None;
    };
    match table.columns.get(index) {
        Some(column) => Some((index, column)),
        None => {
            warn!(
                "Column {} of {} is not in the dictionary ({} columns), skipping",
                image.ordinal,
                table.qualified_name(),
                table.columns.len()
            );
            None
        }
    }
}

fn column_value(column: &Column, value: Field) -> ColumnValue {
    ColumnValue {
        id: column.id,
        name: column.name.clone(),
        data_type: column.data_type.clone(),
        value,
        lob: None,
        is_supplemental_key: false,
        is_key: column.is_key,
    }
}

fn decode_image(column: &Column, tag: &TagRecord) -> Result<Field> {
    match tag.as_value()? {
        Some(bytes) => decode_value(column, &bytes),
        None => Ok(Field::Null),
    }
}

/// Applies a large-object location tag to a value.
fn apply_location(value: &mut ColumnValue, tag: &TagRecord) -> Result<()> {
    let lob = value.lob.get_or_insert_with(Default::default);
    match tag.tag_type {
        TagType::LobOffset => lob.offset = tag.as_u64()?,
        TagType::LobLength => lob.length = tag.as_u64()?,
        TagType::LobPosition => lob.position = tag.as_u32()?,
        _ => {}
    }
    Ok(())
}

fn is_location(tag_type: TagType) -> bool {
    matches!(
        tag_type,
        TagType::LobOffset | TagType::LobLength | TagType::LobPosition
    )
}

/// Row view: one slot per dictionary column, after images win over before images.
fn assemble_row(header: ChangeHeader, table: &Table, images: &[Image<'_>]) -> Result<ChangeRecord> {
    let mut columns: Vec<Option<ColumnValue>> = vec![None; table.columns.len()];
    let mut ranks = vec![0u8; table.columns.len()];

    for image in images {
        let Some((index, column)) = image_column(table, image) else {
            continue;
        };
        let tag_type = image.tag.tag_type;
        if is_location(tag_type) {
            let slot = columns[index].get_or_insert_with(|| column_value(column, Field::Null));
            apply_location(slot, image.tag)?;
            continue;
        }

        let value = decode_image(column, image.tag)?;
        let rank = match tag_type {
            TagType::KeyImage | TagType::OldImage => 1,
            _ => 2,
        };
        let slot = columns[index].get_or_insert_with(|| column_value(column, Field::Null));
        if rank >= ranks[index] {
            slot.value = value;
            ranks[index] = rank;
        }
        if tag_type == TagType::KeyImage {
            slot.is_supplemental_key = true;
        }
    }

    Ok(ChangeRecord {
        header,
        columns,
        multi_part: false,
        complete: true,
    })
}

/// Older schema documents carry no key flags. Supplemental key columns of updates and deletes
/// tell which columns the key is made of.
fn retrofit_key_columns(data: &mut RecordData, cache: &mut StreamCache) {
    let (header, values): (&ChangeHeader, Vec<&mut ColumnValue>) = match data {
        RecordData::Change(record) => (
            &record.header,
            record.columns.iter_mut().flatten().collect(),
        ),
        RecordData::Vector(vector) => (&vector.header, vector.key.iter_mut().collect()),
        _ => return,
    };
    if !header.action.keyed_by_supplemental_key() {
        return;
    }
    let Some(table) = cache.dictionary.get(header.table_id) else {
        return;
    };
    let name = table.qualified_name();
    let lacks_key_flags = cache
        .schemas
        .get(&name)
        .map_or(true, |document| !document.has_key_flags);
    if table.has_key || !lacks_key_flags {
        return;
    }

    let mut ordinals = vec![];
    for value in values {
        if value.is_supplemental_key {
            value.is_key = true;
            if !ordinals.contains(&value.id) {
                ordinals.push(value.id);
            }
        }
    }
    if ordinals.is_empty() {
        return;
    }
    warn!(
        "Schema of {} has no key flags, using supplemental key columns {:?} as key",
        name, ordinals
    );
    cache.dictionary.mark_key_columns(header.table_id, &ordinals);
    cache.schemas.mark_key_columns(&name, &ordinals);
}
