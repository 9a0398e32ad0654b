use std::sync::Arc;

use fxhash::FxHashMap;
use plog_types::{
    kind::EntryKind,
    models::stream::StreamConfig,
    offset::RecordId,
    types::RecordData,
};

use crate::{cache::StreamCache, errors::Result, format::entry::EntryRecord, format::Features};

pub mod change;
pub mod header;
pub mod merge;
pub mod metadata;
pub mod transaction;

/// State an entry decoder reads and updates.
pub struct DecodeContext<'a> {
    pub cache: &'a mut StreamCache,
    pub config: &'a StreamConfig,
    pub features: &'a mut Features,
    pub record_id: RecordId,
}

/// Turns one classified entry into a record, if it produces one.
pub trait EntryDecoder: Send + Sync {
    fn decode(&self, entry: &EntryRecord, context: &mut DecodeContext<'_>)
        -> Result<Option<RecordData>>;
}

/// Decoders keyed by the entry kind they handle.
#[derive(Clone)]
pub struct Decoders {
    decoders: FxHashMap<EntryKind, Arc<dyn EntryDecoder>>,
}

impl std::fmt::Debug for Decoders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoders")
            .field("kinds", &self.decoders.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Decoders {
    fn default() -> Self {
        let change: Arc<dyn EntryDecoder> = Arc::new(change::ChangeAssembler::new());
        let mut decoders: FxHashMap<EntryKind, Arc<dyn EntryDecoder>> = FxHashMap::default();
        decoders.insert(EntryKind::Header, Arc::new(header::HeaderDecoder));
        decoders.insert(EntryKind::Metadata, Arc::new(metadata::MetadataDecoder));
        for kind in [
            EntryKind::Insert,
            EntryKind::Update,
            EntryKind::Delete,
            EntryKind::LobWrite,
            EntryKind::LobErase,
            EntryKind::LobTrim,
            EntryKind::Ddl,
            EntryKind::NoOp,
        ] {
            decoders.insert(kind, change.clone());
        }
        Self { decoders }
    }
}

impl Decoders {
    pub fn get(&self, kind: EntryKind) -> Option<&dyn EntryDecoder> {
        self.decoders.get(&kind).map(|decoder| decoder.as_ref())
    }
}
