//! Aggregate statistics: severity counts, per-severity time series,
//! source-file counts, and frequent message patterns.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::StatsConfig;
use crate::fingerprint;
use crate::normalize;
use crate::types::{Event, FrequentPattern, Severity, Stats, TimeSeries, TimeSeriesPoint};

fn width_millis(bucket_secs: u64) -> i64 {
  i64::try_from(bucket_secs)
    .unwrap_or(i64::MAX)
    .saturating_mul(1000)
    .max(1)
}

/// Bucket number of `ts` at the given width (Euclidean, so pre-epoch floors down).
pub fn bucket_key(ts: &DateTime<Utc>, bucket_secs: u64) -> i64 {
  ts.timestamp_millis().div_euclid(width_millis(bucket_secs))
}

/// Round `ts` down to the start of its bucket.
pub fn bucket_floor(ts: &DateTime<Utc>, bucket_secs: u64) -> DateTime<Utc> {
  let start = bucket_key(ts, bucket_secs).saturating_mul(width_millis(bucket_secs));
  DateTime::from_timestamp_millis(start).unwrap_or(*ts)
}

impl TimeSeries {
  pub fn new(bucket_secs: u64) -> Self {
    Self {
      bucket_secs,
      points: Vec::new(),
    }
  }

  pub fn bucket_width(&self) -> Duration {
    Duration::milliseconds(width_millis(self.bucket_secs))
  }

  /// Count one event in the bucket containing `ts`.
  pub fn add_event(&mut self, ts: DateTime<Utc>) {
    let start = bucket_floor(&ts, self.bucket_secs);
    match self.points.binary_search_by_key(&start, |p| p.timestamp) {
      Ok(i) => self.points[i].count += 1,
      Err(i) => self.points.insert(
        i,
        TimeSeriesPoint {
          timestamp: start,
          count: 1,
        },
      ),
    }
  }

  pub fn total_count(&self) -> usize {
    self.points.iter().map(|p| p.count).sum()
  }

  /// Busiest bucket; the earliest one wins ties.
  pub fn max_point(&self) -> Option<TimeSeriesPoint> {
    self
      .points
      .iter()
      .max_by(|a, b| a.count.cmp(&b.count).then(b.timestamp.cmp(&a.timestamp)))
      .copied()
  }
}

impl Stats {
  pub fn count(&self, severity: Severity) -> usize {
    self.severity_counts.get(&severity).copied().unwrap_or(0)
  }

  pub fn error_count(&self) -> usize {
    self.count(Severity::Error)
  }

  pub fn warn_count(&self) -> usize {
    self.count(Severity::Warn)
  }

  /// Errors per total events (0 when empty).
  pub fn error_rate(&self) -> f64 {
    if self.total_events == 0 {
      return 0.0;
    }
    self.error_count() as f64 / self.total_events as f64
  }

  pub fn series(&self, severity: Severity) -> Option<&TimeSeries> {
    self.severity_series.get(&severity)
  }
}

/// Builds `Stats` in one forward pass plus a pattern pass.
#[derive(Debug, Clone, Default)]
pub struct StatsBuilder {
  config: StatsConfig,
}

impl StatsBuilder {
  pub fn new(config: StatsConfig) -> Self {
    Self { config }
  }

  pub fn build(&self, events: &[Event]) -> Stats {
    let mut stats = Stats {
      total_events: events.len(),
      ..Stats::default()
    };

    for event in events {
      *stats.severity_counts.entry(event.severity).or_insert(0) += 1;

      if !event.source.path.is_empty() {
        *stats
          .source_counts
          .entry(event.source.path.clone())
          .or_insert(0) += 1;
      }

      if let Some(ts) = event.valid_time() {
        stats.start_time = Some(stats.start_time.map_or(ts, |s| s.min(ts)));
        stats.end_time = Some(stats.end_time.map_or(ts, |e| e.max(ts)));
        stats
          .severity_series
          .entry(event.severity)
          .or_insert_with(|| TimeSeries::new(self.config.bucket_secs))
          .add_event(ts);
      }
    }

    stats.frequent_patterns = self.frequent_patterns(events);

    debug!(
      events = stats.total_events,
      errors = stats.error_count(),
      sources = stats.source_counts.len(),
      patterns = stats.frequent_patterns.len(),
      "built stats"
    );
    stats
  }

  fn frequent_patterns(&self, events: &[Event]) -> Vec<FrequentPattern> {
    let mut counts: BTreeMap<String, (usize, Severity)> = BTreeMap::new();

    for event in events {
      if event.message.chars().count() < self.config.min_pattern_length {
        continue;
      }
      let pattern = normalize::message_pattern(&event.message);
      if pattern.is_empty() {
        continue;
      }
      let entry = counts.entry(pattern).or_insert((0, Severity::Unknown));
      entry.0 += 1;
      entry.1 = entry.1.max(event.severity);
    }

    let mut patterns: Vec<FrequentPattern> = counts
      .into_iter()
      .map(|(pattern, (count, max_severity))| FrequentPattern {
        fingerprint: fingerprint::compute(&pattern),
        pattern,
        count,
        max_severity,
      })
      .collect();

    // Deterministic: count desc, then pattern text asc.
    patterns.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.pattern.cmp(&b.pattern)));
    patterns.truncate(self.config.top_n_patterns);
    patterns
  }
}
