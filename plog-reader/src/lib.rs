pub mod cache;
pub mod decode;
pub mod domain;
pub mod errors;
pub mod format;
pub mod stream;
#[cfg(test)]
mod test_util;

pub use cache::StreamCache;
pub use errors::{Error, Result};
pub use plog_types;
pub use stream::{
    DirectorySource, IncludeSource, PlogStream, Predicate, PredicateInput, Predicates, Records,
    ResumeFilter, StreamOptions, StreamState,
};
