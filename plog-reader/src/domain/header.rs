use plog_types::{log::debug, types::RecordData};

use crate::{
    errors::Result,
    format::{entry::EntryRecord, tag::TagType, Features},
};

use super::{DecodeContext, EntryDecoder};

/// Picks up the feature bits the writer announces in the header entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderDecoder;

impl EntryDecoder for HeaderDecoder {
    fn decode(
        &self,
        entry: &EntryRecord,
        context: &mut DecodeContext<'_>,
    ) -> Result<Option<RecordData>> {
        let features = entry.u32_tag(TagType::Features)?.unwrap_or_default();
        debug!("PLOG header features {:#x}", features);
        *context.features = Features(features);
        Ok(None)
    }
}
