//! Dedup/merge of finalized headers into keyed records.
//!
//! The aggregator owns the record map outright; the engine refers to
//! records only by their dedup key, never by reference. Merge rules:
//! first occurrence wins for type/message/location, repeat hits only bump
//! the counter and widen the seen window.

use std::collections::{BTreeMap, HashMap};
use std::collections::hash_map::Entry;

use crate::cache::CacheState;
use crate::classify;
use crate::excerpt::ExcerptReader;
use crate::model::{ErrorRecord, HeaderLine};

pub struct Aggregator {
    records: HashMap<String, ErrorRecord>,
    /// Lowercased type name → display slug.
    type_registry: BTreeMap<String, String>,
    /// Lowercased type name → number of distinct records of that type.
    type_counts: BTreeMap<String, u64>,
    excerpts: Option<Box<dyn ExcerptReader>>,
}

impl Aggregator {
    pub fn new(excerpts: Option<Box<dyn ExcerptReader>>) -> Self {
        Self::from_state(CacheState::empty(), excerpts)
    }

    /// Resume from a restored cache state so dedup/merge continues across
    /// runs. The cached offset is the cursor's concern, not ours.
    pub fn from_state(state: CacheState, excerpts: Option<Box<dyn ExcerptReader>>) -> Self {
        Self {
            records: state.records,
            type_registry: state.type_registry,
            type_counts: state.type_counts,
            excerpts,
        }
    }

    /// Fold one finalized header into the record map and return its dedup
    /// key: the location-stripped core message when a suffix was found,
    /// else the full message.
    pub fn merge(&mut self, header: HeaderLine) -> String {
        let split = classify::split_location_suffix(&header.message);
        let key = split
            .as_ref()
            .map(|s| s.core.clone())
            .unwrap_or_else(|| header.message.clone());

        let type_lower = header.error_type.to_lowercase();
        self.type_registry
            .entry(type_lower.clone())
            .or_insert_with(|| classify::type_slug(&header.error_type));

        match self.records.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                record.hits += 1;
                if let Some(ts) = header.timestamp {
                    record.first_seen = Some(record.first_seen.map_or(ts, |first| first.min(ts)));
                    record.last_seen = Some(record.last_seen.map_or(ts, |last| last.max(ts)));
                }
                tracing::trace!(key = %key, hits = record.hits, "repeat hit");
            }
            Entry::Vacant(vacant) => {
                let mut record = ErrorRecord {
                    error_type: header.error_type,
                    message: header.message,
                    core_message: None,
                    first_seen: header.timestamp,
                    last_seen: header.timestamp,
                    hits: 1,
                    trace: None,
                    context: None,
                    source_path: None,
                    source_line: None,
                    excerpt: None,
                };
                if let Some(split) = split {
                    record.excerpt = self
                        .excerpts
                        .as_ref()
                        .and_then(|reader| reader.read_excerpt(&split.path, split.line));
                    record.core_message = Some(split.core);
                    record.source_path = Some(split.path);
                    record.source_line = Some(split.line);
                }
                tracing::debug!(key = %key, error_type = %record.error_type, "new record");
                vacant.insert(record);
                *self.type_counts.entry(type_lower).or_insert(0) += 1;
            }
        }
        key
    }

    /// Attach a collected trace blob to the record behind `key`. A later
    /// occurrence with its own trace overwrites the earlier one.
    pub fn attach_trace(&mut self, key: &str, trace: String) {
        if let Some(record) = self.records.get_mut(key) {
            record.trace = Some(trace);
        }
    }

    /// Attach a free-form context blob to the record behind `key`.
    pub fn attach_context(&mut self, key: &str, context: String) {
        if let Some(record) = self.records.get_mut(key) {
            record.context = Some(context);
        }
    }

    pub fn records(&self) -> &HashMap<String, ErrorRecord> {
        &self.records
    }

    pub fn type_registry(&self) -> &BTreeMap<String, String> {
        &self.type_registry
    }

    pub fn type_counts(&self) -> &BTreeMap<String, u64> {
        &self.type_counts
    }

    /// Turn the accumulated state back into a cache payload, stamped with
    /// the byte offset the next run should resume from.
    pub fn into_state(self, offset: u64) -> CacheState {
        CacheState {
            offset,
            records: self.records,
            type_registry: self.type_registry,
            type_counts: self.type_counts,
        }
    }
}
