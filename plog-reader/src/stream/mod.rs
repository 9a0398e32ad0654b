use std::{
    collections::VecDeque,
    io::{BufReader, Read},
    sync::Arc,
};

use plog_types::{
    kind::EntryKind,
    log::{debug, info, trace, warn},
    models::stream::StreamConfig,
    offset::{PlogFile, RecordId, StreamOffset},
    types::{DomainRecord, RecordData, TransactionSummary},
};

use crate::{
    cache::StreamCache,
    domain::{
        change::entry_schema,
        merge::{self, Merged},
        transaction::{self, Observation},
        DecodeContext, Decoders,
    },
    errors::{Error, Result},
    format::{
        chunk::ChunkReader,
        entry::{EntryReader, EntryRecord},
        read_file_header,
        tag::TagType,
        Features,
    },
};

mod predicate;
mod proxy;

pub use predicate::{Predicate, PredicateInput, Predicates, ResumeFilter};
pub use proxy::{DirectorySource, IncludeProxy, IncludeSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Unopened,
    HeaderRead,
    Reading,
    /// An included file is being decoded.
    Paused,
    Done,
}

/// Everything a stream shares with the streams of its included files.
#[derive(Clone, Default)]
pub struct StreamOptions {
    pub config: StreamConfig,
    pub predicates: Predicates,
    pub include_source: Option<Arc<dyn IncludeSource>>,
}

impl std::fmt::Debug for StreamOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamOptions")
            .field("config", &self.config)
            .field("predicates", &self.predicates)
            .field("include_source", &self.include_source.is_some())
            .finish()
    }
}

impl StreamOptions {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn with_predicates(mut self, predicates: Predicates) -> Self {
        self.predicates = predicates;
        self
    }

    pub fn with_include_source(mut self, source: impl IncludeSource + 'static) -> Self {
        self.include_source = Some(Arc::new(source));
        self
    }
}

/// Decodes one PLOG file into domain records, batch by batch.
pub struct PlogStream<R> {
    file: PlogFile,
    entries: EntryReader<BufReader<R>>,
    state: StreamState,
    options: StreamOptions,
    decoders: Decoders,
    cache: StreamCache,
    features: Features,
    entry_seq: u32,
    /// Set for included files, whose records are reported at the include entry.
    emit_offset: Option<StreamOffset>,
    batch: Vec<DomainRecord>,
    proxy: Option<Box<IncludeProxy>>,
    /// Data records emitted by the last included file, until its statistics entry shows up.
    included_records: Option<u64>,
}

impl<R> std::fmt::Debug for PlogStream<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlogStream")
            .field("file", &self.file)
            .field("state", &self.state)
            .field("features", &self.features)
            .field("entry_seq", &self.entry_seq)
            .field("batch", &self.batch.len())
            .field("proxy", &self.proxy)
            .finish()
    }
}

impl<R: Read> PlogStream<R> {
    pub fn new(file: PlogFile, source: R, options: StreamOptions) -> Self {
        Self {
            file,
            entries: EntryReader::new(ChunkReader::new(BufReader::new(source))),
            state: StreamState::Unopened,
            options,
            decoders: Decoders::default(),
            cache: StreamCache::default(),
            features: Features::default(),
            entry_seq: 0,
            emit_offset: None,
            batch: vec![],
            proxy: None,
            included_records: None,
        }
    }

    /// Creates the stream and reads the file header.
    pub fn open(file: PlogFile, source: R, options: StreamOptions) -> Result<Self> {
        let mut stream = Self::new(file, source, options);
        stream.read_header()?;
        Ok(stream)
    }

    /// Starts from the cache of the previous file, see [`PlogStream::continuation`].
    pub fn with_cache(mut self, cache: StreamCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_decoders(mut self, decoders: Decoders) -> Self {
        self.decoders = decoders;
        self
    }

    pub fn file(&self) -> &PlogFile {
        &self.file
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == StreamState::Done
    }

    pub fn features(&self) -> Features {
        self.features
    }

    pub fn cache(&self) -> &StreamCache {
        &self.cache
    }

    /// Position of the next entry in this file.
    pub fn offset(&self) -> StreamOffset {
        StreamOffset::new(self.file.uid(), self.entries.offset())
    }

    /// Cache to start the next file with.
    pub fn continuation(&self) -> StreamCache {
        self.cache.continuation()
    }

    /// Takes the decoded records.
    pub fn flush(&mut self) -> Vec<DomainRecord> {
        std::mem::take(&mut self.batch)
    }

    fn take(&mut self, limit: usize) -> Vec<DomainRecord> {
        let count = limit.min(self.batch.len());
        self.batch.drain(..count).collect()
    }

    /// Emits the summary of the transaction in progress, whether or not it ended. Held data
    /// records are released first.
    pub fn flush_transactions(&mut self) {
        self.release_pending();
        if let Some(summary) = transaction::flush(&mut self.cache) {
            self.emit_transaction(summary);
        }
    }

    /// Drops the per-file state. The returned cache keeps the transaction state only.
    pub fn close(mut self) -> StreamCache {
        debug!("Closing {} at {}", self.file, self.offset());
        self.cache.clear();
        self.cache
    }

    pub(crate) fn into_cache(self) -> StreamCache {
        self.cache
    }

    /// Decodes entries until the batch is full or the footer was read.
    ///
    /// A clean end of the available input is [`Error::StreamClosed`]. Records decoded so far stay
    /// in the batch and reading may resume once the source has grown.
    pub fn read(&mut self) -> Result<()> {
        self.fill(self.options.config.batch_size())
    }

    fn fill(&mut self, batch_size: usize) -> Result<()> {
        if self.state == StreamState::Unopened {
            self.read_header()?;
        }
        while self.batch.len() < batch_size {
            match self.state {
                StreamState::Done => break,
                StreamState::Paused => self.poll_include(batch_size)?,
                _ => {
                    let entry = self.entries.next_entry()?;
                    self.state = StreamState::Reading;
                    self.process(entry)?;
                }
            }
        }
        Ok(())
    }

    /// Iterates over all records available now. Ends with the summary of the last transaction.
    pub fn records(&mut self) -> Records<'_, R> {
        Records {
            stream: self,
            buffer: VecDeque::new(),
            error: None,
            finished: false,
        }
    }

    fn read_header(&mut self) -> Result<()> {
        let header = read_file_header(self.entries.chunks_mut())?;
        info!(
            "Opened {} (PLOG {}.{})",
            self.file, header.major, header.minor
        );
        self.state = StreamState::HeaderRead;
        Ok(())
    }

    fn process(&mut self, entry: EntryRecord) -> Result<()> {
        self.entry_seq += 1;
        let record_id = RecordId::new(self.file.sequence, self.entry_seq);
        let offset = self
            .emit_offset
            .unwrap_or_else(|| StreamOffset::new(self.file.uid(), entry.offset));
        trace!("{} entry at {}", entry.kind, entry.offset);

        if entry.kind != EntryKind::LobWrite {
            self.release_pending();
        }

        match entry.kind {
            EntryKind::None => warn!(
                "Skipping entry of unknown type {}.{} at {} in {}",
                entry.major, entry.subtype, entry.offset, self.file
            ),
            EntryKind::Header => {
                self.decode(&entry, record_id)?;
            }
            EntryKind::Footer => {
                self.state = StreamState::Done;
                info!("Reached end of {}", self.file);
            }
            EntryKind::Metadata => {
                let schema = entry_schema(&entry, &self.cache.dictionary)?;
                if self.parses(entry.kind, &schema, offset) {
                    if let Some(data) = self.decode(&entry, record_id)? {
                        self.emit(DomainRecord::new(offset, data));
                    }
                }
            }
            EntryKind::Commit => self.observe(&entry, record_id, offset, None)?,
            EntryKind::IncludeFile => self.include(&entry, offset)?,
            EntryKind::IncludeStats => self.check_include_stats(&entry)?,
            _ => self.process_change(&entry, record_id, offset)?,
        }
        Ok(())
    }

    fn process_change(
        &mut self,
        entry: &EntryRecord,
        record_id: RecordId,
        offset: StreamOffset,
    ) -> Result<()> {
        if self.options.config.require_features && !self.features.supports_data() {
            return Err(Error::UnsupportedFeatures);
        }
        let schema = entry_schema(entry, &self.cache.dictionary)?;
        if !self.parses(entry.kind, &schema, offset) {
            return self.observe(entry, record_id, offset, schema.as_deref());
        }

        let data = match self.decode(entry, record_id)? {
            Some(RecordData::Change(record)) if self.options.config.merge_multipart => {
                match merge::merge(&mut self.cache, offset, record)? {
                    Merged::Emit(record) => Some(RecordData::Change(record)),
                    Merged::Pending => None,
                    Merged::Fragment => return Ok(()),
                }
            }
            data => data,
        };
        self.observe(entry, record_id, offset, schema.as_deref())?;
        if let Some(data) = data {
            self.emit(DomainRecord::new(offset, data));
        }
        Ok(())
    }

    fn parses(&self, kind: EntryKind, schema: &Option<String>, offset: StreamOffset) -> bool {
        let input = PredicateInput {
            kind,
            schema: schema.clone(),
            offset,
        };
        let parses = (self.options.predicates.parse)(&input);
        if !parses {
            trace!("Not parsing {} entry of {:?} at {}", kind, schema, offset);
        }
        parses
    }

    fn decode(&mut self, entry: &EntryRecord, record_id: RecordId) -> Result<Option<RecordData>> {
        let Some(decoder) = self.decoders.get(entry.kind) else {
            return Ok(None);
        };
        let mut context = DecodeContext {
            cache: &mut self.cache,
            config: &self.options.config,
            features: &mut self.features,
            record_id,
        };
        decoder.decode(entry, &mut context)
    }

    fn observe(
        &mut self,
        entry: &EntryRecord,
        record_id: RecordId,
        offset: StreamOffset,
        schema: Option<&str>,
    ) -> Result<()> {
        let observation = Observation {
            file_id: self.file.uid(),
            record_id,
            offset,
            schema,
        };
        if let Some(summary) = transaction::observe(&mut self.cache, entry, observation)? {
            self.emit_transaction(summary);
        }
        Ok(())
    }

    fn release_pending(&mut self) {
        for pending in merge::release_pending(&mut self.cache) {
            self.emit(DomainRecord::new(
                pending.offset,
                RecordData::Change(pending.record),
            ));
        }
    }

    fn emit_transaction(&mut self, summary: TransactionSummary) {
        let offset = summary.last_offset;
        self.emit(DomainRecord::new(offset, RecordData::Transaction(summary)));
    }

    fn emit(&mut self, record: DomainRecord) {
        let input = PredicateInput::from_record(&record);
        if !(self.options.predicates.persist)(&input) {
            trace!("Not persisting {} record at {}", input.kind, input.offset);
            return;
        }
        if !(self.options.predicates.filter)(&input) {
            trace!("Filtered {} record at {}", input.kind, input.offset);
            return;
        }
        self.batch.push(record);
    }

    fn include(&mut self, entry: &EntryRecord, offset: StreamOffset) -> Result<()> {
        let file_id = entry.u64_tag(TagType::IncludeFileId)?.unwrap_or_default();
        let name = entry.str_tag(TagType::IncludeFileName)?.unwrap_or_default();
        let start = entry.u32_tag(TagType::IncludeStart)?.unwrap_or_default();
        let file = PlogFile::from_uid(file_id, name);

        let source = self
            .options
            .include_source
            .as_ref()
            .ok_or_else(|| Error::MissingIncludeSource(file.name.clone()))?;
        let reader = source.open(&file)?;
        info!("Including {} at {}", file, offset);

        let mut nested = PlogStream::new(file, reader, self.options.clone())
            .with_cache(self.cache.continuation())
            .with_decoders(self.decoders.clone());
        nested.features = self.features;
        nested.emit_offset = Some(offset);
        nested.entry_seq = start.saturating_sub(1);
        nested.read_header()?;

        self.proxy = Some(Box::new(IncludeProxy::new(nested)));
        self.included_records = None;
        self.state = StreamState::Paused;
        Ok(())
    }

    fn poll_include(&mut self, batch_size: usize) -> Result<()> {
        let Some(proxy) = self.proxy.as_mut() else {
            self.state = StreamState::Reading;
            return Ok(());
        };
        let (records, finished) = proxy.poll(batch_size.saturating_sub(self.batch.len()))?;
        self.batch.extend(records);
        if finished {
            if let Some(proxy) = self.proxy.take() {
                let (cache, data_records) = proxy.finish();
                self.cache.merge_back(cache);
                self.included_records = Some(data_records);
            }
            self.state = StreamState::Reading;
        }
        Ok(())
    }

    fn check_include_stats(&mut self, entry: &EntryRecord) -> Result<()> {
        let Some(expected) = entry.u64_tag(TagType::IncludeRows)? else {
            return Ok(());
        };
        match self.included_records.take() {
            Some(actual) if actual != expected => warn!(
                "Included file announced {} rows, {} data records were decoded",
                expected, actual
            ),
            Some(_) => debug!("Included file statistics match: {} rows", expected),
            None => warn!(
                "Include statistics at {} in {} follow no included file",
                entry.offset, self.file
            ),
        }
        Ok(())
    }
}

/// Iterator over the records of a stream, see [`PlogStream::records`].
pub struct Records<'a, R> {
    stream: &'a mut PlogStream<R>,
    buffer: VecDeque<DomainRecord>,
    error: Option<Error>,
    finished: bool,
}

impl<R: Read> Iterator for Records<'_, R> {
    type Item = Result<DomainRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Some(Ok(record));
            }
            if let Some(error) = self.error.take() {
                return Some(Err(error));
            }
            if self.finished {
                return None;
            }

            match self.stream.read() {
                Ok(()) if self.stream.is_done() => self.finish(),
                Ok(()) => {}
                Err(Error::StreamClosed) => self.finish(),
                Err(e) => {
                    self.finished = true;
                    self.error = Some(e);
                }
            }
            self.buffer.extend(self.stream.flush());
        }
    }
}

impl<R: Read> Records<'_, R> {
    fn finish(&mut self) {
        self.stream.flush_transactions();
        self.finished = true;
    }
}
