use plog_types::{
    chrono::{DateTime, TimeZone, Utc},
    log::debug,
    offset::{RecordId, StreamOffset},
    types::TransactionSummary,
};

use crate::{
    cache::StreamCache,
    errors::Result,
    format::{entry::EntryRecord, tag::TagType},
};

/// What the aggregator needs to know about one entry.
#[derive(Debug, Clone)]
pub struct Observation<'a> {
    pub file_id: u64,
    pub record_id: RecordId,
    pub offset: StreamOffset,
    /// Qualified table name, for data-bearing entries.
    pub schema: Option<&'a str>,
}

/// Folds entries into per-transaction summaries kept in the shared transaction map.
///
/// A summary is handed out once an entry of another transaction shows up.
pub fn observe(
    cache: &mut StreamCache,
    entry: &EntryRecord,
    observation: Observation<'_>,
) -> Result<Option<TransactionSummary>> {
    let Some(xid) = entry.str_tag(TagType::Xid)? else {
        return Ok(None);
    };
    let scn = entry.u64_tag(TagType::Scn)?;
    let time = entry
        .u64_tag(TagType::Timestamp)?
        .and_then(|seconds| Utc.timestamp_opt(seconds as i64, 0).single());

    let finished = if cache.current_transaction.as_deref() != Some(xid.as_str()) {
        let previous = cache.current_transaction.replace(xid.clone());
        previous.and_then(|previous| finish(cache, &previous))
    } else {
        None
    };

    let mut transactions = cache.transactions.lock();
    let summary = transactions
        .entry(xid.clone())
        .or_insert_with(|| TransactionSummary::new(xid));
    extend(&mut summary.start_file_id, &mut summary.end_file_id, observation.file_id);
    if let Some(scn) = scn.filter(|scn| *scn != 0) {
        extend(&mut summary.start_scn, &mut summary.end_scn, scn);
    }
    if let Some(time) = time {
        extend_time(&mut summary.start_time, &mut summary.end_time, time);
    }
    extend(
        &mut summary.start_record_id,
        &mut summary.end_record_id,
        observation.record_id,
    );
    if entry.kind.is_data_bearing() {
        summary.record_count += 1;
        if let Some(schema) = observation.schema {
            *summary.schema_counts.entry(schema.to_string()).or_default() += 1;
        }
    }
    summary.size += entry.size_in_bytes();
    summary.last_offset = summary.last_offset.max(observation.offset);

    Ok(finished)
}

/// Hands out the current summary regardless of what follows.
pub fn flush(cache: &mut StreamCache) -> Option<TransactionSummary> {
    let current = cache.current_transaction.take()?;
    finish(cache, &current)
}

fn finish(cache: &StreamCache, xid: &str) -> Option<TransactionSummary> {
    let summary = cache.transactions.lock().remove(xid)?;
    if summary.is_valid() {
        Some(summary)
    } else {
        debug!("Dropping incomplete transaction summary {:?}", summary);
        None
    }
}

/// Widens `[start, end]` to cover `value`. A default start means unset.
fn extend<T: Ord + Copy + Default>(start: &mut T, end: &mut T, value: T) {
    if *start == T::default() || value < *start {
        *start = value;
    }
    if value > *end {
        *end = value;
    }
}

fn extend_time(
    start: &mut Option<DateTime<Utc>>,
    end: &mut Option<DateTime<Utc>>,
    value: DateTime<Utc>,
) {
    *start = Some(start.map_or(value, |start| start.min(value)));
    *end = Some(end.map_or(value, |end| end.max(value)));
}
