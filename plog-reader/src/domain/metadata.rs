use plog_types::{
    log::{debug, info},
    types::RecordData,
};

use crate::{
    cache::{parse_schema_document, SchemaChange},
    errors::{Error, Result},
    format::{entry::EntryRecord, tag::TagType},
};

use super::{DecodeContext, EntryDecoder};

/// Applies schema documents to the caches and reports the resulting table definition.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataDecoder;

impl EntryDecoder for MetadataDecoder {
    fn decode(
        &self,
        entry: &EntryRecord,
        context: &mut DecodeContext<'_>,
    ) -> Result<Option<RecordData>> {
        let json = entry
            .str_tag(TagType::DdlJson)?
            .ok_or_else(|| Error::MalformedEntry {
                offset: entry.offset,
                reason: "metadata entry without schema document".to_string(),
            })?;
        let document = parse_schema_document(&json)?;
        let name = document.qualified_name();

        if let Some(cached) = context.cache.schemas.get(&name) {
            if document.valid_since <= cached.valid_since {
                debug!(
                    "Ignoring schema of {} valid since {}, cached version is valid since {}",
                    name, document.valid_since, cached.valid_since
                );
                return Ok(None);
            }
        }

        // both caches accept the document or neither changes
        let table = document.to_table();
        if let Some(table) = &table {
            context.cache.dictionary.check(table)?;
        }
        context.cache.schemas.check(&document)?;

        if let Some(table) = table {
            context.cache.dictionary.apply(table)?;
        }
        let change = context.cache.schemas.apply(document)?;
        if change == SchemaChange::Stale {
            return Ok(None);
        }
        info!("Schema of {}: {:?}", name, change);

        Ok(context
            .cache
            .schemas
            .get(&name)
            .cloned()
            .map(RecordData::Metadata))
    }
}
