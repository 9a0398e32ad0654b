use std::sync::Arc;

use fxhash::FxHashMap;
use plog_types::{kind::EntryKind, offset::StreamOffset, types::DomainRecord};

/// What a predicate gets to see of an entry or a decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateInput {
    pub kind: EntryKind,
    /// Qualified table name, when the entry is bound to a table.
    pub schema: Option<String>,
    pub offset: StreamOffset,
}

impl PredicateInput {
    pub fn from_record(record: &DomainRecord) -> Self {
        Self {
            kind: record.kind(),
            schema: record.schema_name(),
            offset: record.offset,
        }
    }
}

pub type Predicate = Arc<dyn Fn(&PredicateInput) -> bool + Send + Sync>;

fn accept_all() -> Predicate {
    Arc::new(|_: &PredicateInput| true)
}

/// Gates applied while decoding.
#[derive(Clone)]
pub struct Predicates {
    /// Whether a metadata or change entry is decoded at all.
    pub parse: Predicate,
    /// Whether a decoded record is kept.
    pub persist: Predicate,
    /// Whether a kept record is delivered, see [`ResumeFilter`].
    pub filter: Predicate,
}

impl Default for Predicates {
    fn default() -> Self {
        Self {
            parse: accept_all(),
            persist: accept_all(),
            filter: accept_all(),
        }
    }
}

impl std::fmt::Debug for Predicates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predicates").finish_non_exhaustive()
    }
}

impl Predicates {
    pub fn with_parse(
        mut self,
        parse: impl Fn(&PredicateInput) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.parse = Arc::new(parse);
        self
    }

    pub fn with_persist(
        mut self,
        persist: impl Fn(&PredicateInput) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.persist = Arc::new(persist);
        self
    }

    pub fn with_filter(
        mut self,
        filter: impl Fn(&PredicateInput) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    /// Parses only entries of the given tables. Entries not bound to a table always pass.
    pub fn tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tables: Vec<String> = tables.into_iter().map(Into::into).collect();
        Self::default().with_parse(move |input| {
            input
                .schema
                .as_ref()
                .map_or(true, |schema| tables.contains(schema))
        })
    }
}

/// Last delivered offset per table, for resuming a stream where a consumer left off.
///
/// Records not bound to a table are tracked under `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeFilter {
    delivered: FxHashMap<Option<String>, StreamOffset>,
}

impl ResumeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&mut self, schema: Option<String>, offset: StreamOffset) {
        let last = self.delivered.entry(schema).or_default();
        *last = (*last).max(offset);
    }

    pub fn last_delivered(&self, schema: Option<&str>) -> Option<StreamOffset> {
        self.delivered.get(&schema.map(str::to_string)).copied()
    }

    /// Whether a record at this position has not been delivered yet.
    pub fn accepts(&self, input: &PredicateInput) -> bool {
        match self.delivered.get(&input.schema) {
            Some(last) => input.offset > *last,
            None => true,
        }
    }

    pub fn into_predicate(self) -> Predicate {
        Arc::new(move |input: &PredicateInput| self.accepts(input))
    }
}

#[cfg(test)]
mod tests {
    use plog_types::{
        offset::RecordId,
        types::{ChangeAction, ChangeHeader, ChangeRecord, RecordData},
    };

    use super::*;

    fn input(schema: Option<&str>, byte_offset: u64) -> PredicateInput {
        PredicateInput {
            kind: EntryKind::Insert,
            schema: schema.map(str::to_string),
            offset: StreamOffset::new(1, byte_offset),
        }
    }

    #[test]
    fn test_resume_filter_keeps_later_records() {
        let mut filter = ResumeFilter::new();
        filter.delivered(Some("APP.EMP".to_string()), StreamOffset::new(1, 200));
        filter.delivered(Some("APP.EMP".to_string()), StreamOffset::new(1, 100));
        assert_eq!(
            filter.last_delivered(Some("APP.EMP")),
            Some(StreamOffset::new(1, 200))
        );

        assert!(!filter.accepts(&input(Some("APP.EMP"), 100)));
        assert!(!filter.accepts(&input(Some("APP.EMP"), 200)));
        assert!(filter.accepts(&input(Some("APP.EMP"), 201)));
        assert!(filter.accepts(&input(Some("APP.DEPT"), 16)));
        assert!(filter.accepts(&input(None, 16)));

        let predicate = filter.into_predicate();
        assert!(!predicate(&input(Some("APP.EMP"), 150)));
    }

    #[test]
    fn test_table_predicate() {
        let predicates = Predicates::tables(["APP.EMP"]);
        assert!((predicates.parse)(&input(Some("APP.EMP"), 0)));
        assert!(!(predicates.parse)(&input(Some("APP.DEPT"), 0)));
        assert!((predicates.parse)(&input(None, 0)));
        assert!((predicates.persist)(&input(Some("APP.DEPT"), 0)));
    }

    #[test]
    fn test_input_from_record() {
        let record = DomainRecord::new(
            StreamOffset::new(2, 64),
            RecordData::Change(ChangeRecord {
                header: ChangeHeader {
                    action: ChangeAction::Delete,
                    id: RecordId::new(2, 1),
                    owner: "APP".to_string(),
                    table_name: "EMP".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            }),
        );
        assert_eq!(
            PredicateInput::from_record(&record),
            PredicateInput {
                kind: EntryKind::Delete,
                schema: Some("APP.EMP".to_string()),
                offset: StreamOffset::new(2, 64),
            }
        );
    }
}
