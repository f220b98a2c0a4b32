//! Lookup tables over an immutable event sequence.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::config::IndexConfig;
use crate::correlation;
use crate::stats::bucket_key;
use crate::types::{Event, EventId, Severity};

/// Severity, correlation-id and time-bucket indices. Misses return empty results.
#[derive(Debug, Clone, Default)]
pub struct EventIndex {
  config: IndexConfig,
  by_severity: HashMap<Severity, Vec<EventId>>,
  by_correlation: HashMap<String, Vec<EventId>>,
  by_bucket: BTreeMap<i64, Vec<EventId>>,
}

impl EventIndex {
  pub fn new(config: IndexConfig) -> Self {
    Self {
      config,
      ..Self::default()
    }
  }

  /// Replace all index state with entries for `events`.
  pub fn build(&mut self, events: &[Event]) {
    self.by_severity.clear();
    self.by_correlation.clear();
    self.by_bucket.clear();

    for event in events {
      self.by_severity.entry(event.severity).or_default().push(event.id);

      for id in correlation::ids(event, &correlation::INDEX_KEYS) {
        self
          .by_correlation
          .entry(id.to_string())
          .or_default()
          .push(event.id);
      }

      if let Some(ts) = event.valid_time() {
        self
          .by_bucket
          .entry(bucket_key(&ts, self.config.bucket_secs))
          .or_default()
          .push(event.id);
      }
    }

    debug!(
      events = events.len(),
      correlation_keys = self.by_correlation.len(),
      buckets = self.by_bucket.len(),
      "built event index"
    );
  }

  pub fn get_by_severity(&self, severity: Severity) -> &[EventId] {
    self.by_severity.get(&severity).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn get_by_correlation_id(&self, id: &str) -> &[EventId] {
    self.by_correlation.get(id).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn count_by_severity(&self, severity: Severity) -> usize {
    self.get_by_severity(severity).len()
  }

  /// Events whose bucket lies in `[floor(start), floor(end)]`, in bucket order.
  pub fn get_by_time_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<EventId> {
    let lo = bucket_key(&start, self.config.bucket_secs);
    let hi = bucket_key(&end, self.config.bucket_secs);
    if lo > hi {
      return Vec::new();
    }
    self
      .by_bucket
      .range(lo..=hi)
      .flat_map(|(_, ids)| ids.iter().copied())
      .collect()
  }
}
