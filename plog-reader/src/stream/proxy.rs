use std::{
    fs::File,
    io::{self, Read},
    path::PathBuf,
};

use plog_types::{log::info, offset::PlogFile, types::DomainRecord};

use crate::{
    cache::StreamCache,
    errors::{Error, Result},
};

use super::PlogStream;

/// Opens files referenced by include entries.
pub trait IncludeSource: Send + Sync {
    fn open(&self, file: &PlogFile) -> io::Result<Box<dyn Read + Send>>;
}

/// Resolves included files by name inside a directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl IncludeSource for DirectorySource {
    fn open(&self, file: &PlogFile) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(self.root.join(&file.name))?))
    }
}

/// A nested stream decoding an included file on behalf of its parent.
pub struct IncludeProxy {
    stream: PlogStream<Box<dyn Read + Send>>,
    exhausted: bool,
    data_records: u64,
}

impl std::fmt::Debug for IncludeProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncludeProxy")
            .field("file", self.stream.file())
            .field("exhausted", &self.exhausted)
            .field("data_records", &self.data_records)
            .finish()
    }
}

impl IncludeProxy {
    pub fn new(stream: PlogStream<Box<dyn Read + Send>>) -> Self {
        Self {
            stream,
            exhausted: false,
            data_records: 0,
        }
    }

    pub fn file(&self) -> &PlogFile {
        self.stream.file()
    }

    /// Decodes up to `limit` records of the included file. The flag tells whether the file is
    /// exhausted and every record was handed out.
    pub fn poll(&mut self, limit: usize) -> Result<(Vec<DomainRecord>, bool)> {
        if !self.exhausted && self.stream.batch.len() < limit {
            match self.stream.fill(limit) {
                Ok(()) => self.exhausted = self.stream.is_done(),
                Err(Error::StreamClosed) => self.exhausted = true,
                Err(e) => return Err(e),
            }
        }
        let records = self.stream.take(limit);
        self.data_records += records.iter().filter(|record| record.is_data()).count() as u64;
        Ok((records, self.exhausted && self.stream.batch.is_empty()))
    }

    /// Hands back what the nested stream learned, with the number of data records it emitted.
    pub fn finish(self) -> (StreamCache, u64) {
        info!(
            "Finished included file {} with {} data records",
            self.stream.file(),
            self.data_records
        );
        (self.stream.into_cache(), self.data_records)
    }
}
