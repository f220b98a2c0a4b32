//! Core types for the narrative engine (input contract + analysis outputs).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

// ---------------------------------------------------------------------------
// Inbound types (what the framing/extraction layer hands us)
// ---------------------------------------------------------------------------

/// Unique, monotonically assigned event identifier.
pub type EventId = u64;

/// Extracted metadata fields (request_id, trace_id, uuid, arbitrary k=v).
pub type TagMap = HashMap<String, String>;

/// Log severity, ordered from least to most severe.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
  #[default]
  Unknown,
  Trace,
  Debug,
  Info,
  Warn,
  Error,
  Fatal,
}

impl Severity {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Unknown => "UNKNOWN",
      Self::Trace => "TRACE",
      Self::Debug => "DEBUG",
      Self::Info => "INFO",
      Self::Warn => "WARN",
      Self::Error => "ERROR",
      Self::Fatal => "FATAL",
    }
  }

  /// ERROR or FATAL.
  pub fn is_error(self) -> bool {
    self >= Self::Error
  }
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Case-insensitive severity lookup, including common aliases.
/// Anything unrecognized maps to `Unknown`.
pub fn severity_from_string(s: &str) -> Severity {
  match s.to_ascii_uppercase().as_str() {
    "TRACE" | "VERBOSE" => Severity::Trace,
    "DEBUG" | "DBG" => Severity::Debug,
    "INFO" | "INFORMATION" => Severity::Info,
    "WARN" | "WARNING" => Severity::Warn,
    "ERROR" | "ERR" => Severity::Error,
    "FATAL" | "CRITICAL" | "SEVERE" => Severity::Fatal,
    _ => Severity::Unknown,
  }
}

/// A parsed timestamp plus how much the extractor trusts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
  pub time: DateTime<Utc>,
  /// 0..=100; 0 means "no usable timestamp".
  pub confidence: u8,
  /// True if the source line named its timezone explicitly.
  #[serde(default)]
  pub tz_known: bool,
}

impl Timestamp {
  pub fn new(time: DateTime<Utc>) -> Self {
    Self {
      time,
      confidence: 100,
      tz_known: true,
    }
  }

  pub fn is_valid(&self) -> bool {
    self.confidence > 0
  }
}

/// Where an event came from: file path plus line range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
  pub path: String,
  pub start_line: u32,
  pub end_line: u32,
}

impl SourceRef {
  pub fn new(path: impl Into<String>, start_line: u32, end_line: u32) -> Self {
    Self {
      path: path.into(),
      start_line,
      end_line,
    }
  }
}

impl fmt::Display for SourceRef {
  /// `path:start` or `path:start-end`.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.path, self.start_line)?;
    if self.end_line != self.start_line {
      write!(f, "-{}", self.end_line)?;
    }
    Ok(())
  }
}

/// Canonical event. Read-only to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  pub id: EventId,
  #[serde(default)]
  pub timestamp: Option<Timestamp>,
  #[serde(default)]
  pub severity: Severity,
  pub message: String,
  #[serde(default)]
  pub raw: String,
  #[serde(default)]
  pub source: SourceRef,
  #[serde(default)]
  pub tags: TagMap,
}

impl Event {
  pub fn new(id: EventId, severity: Severity, message: impl Into<String>) -> Self {
    let message = message.into();
    Self {
      id,
      timestamp: None,
      severity,
      raw: message.clone(),
      message,
      source: SourceRef::default(),
      tags: TagMap::new(),
    }
  }

  pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
    self.timestamp = Some(Timestamp::new(time));
    self
  }

  pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
    self.timestamp = Some(timestamp);
    self
  }

  pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.tags.insert(key.into(), value.into());
    self
  }

  pub fn with_source(mut self, source: SourceRef) -> Self {
    self.source = source;
    self
  }

  /// The timestamp, only if present and valid.
  pub fn valid_time(&self) -> Option<DateTime<Utc>> {
    self
      .timestamp
      .as_ref()
      .filter(|ts| ts.is_valid())
      .map(|ts| ts.time)
  }
}

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// A stable hex string identifying a normalized message pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
  /// Bucket start.
  pub timestamp: DateTime<Utc>,
  pub count: usize,
}

/// Event counts at a fixed bucket width. Points are kept sorted by bucket start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeries {
  pub bucket_secs: u64,
  pub points: Vec<TimeSeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequentPattern {
  pub pattern: String,
  pub fingerprint: Fingerprint,
  pub count: usize,
  pub max_severity: Severity,
}

/// Aggregate statistics over one event sequence. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
  pub severity_counts: BTreeMap<Severity, usize>,
  pub severity_series: BTreeMap<Severity, TimeSeries>,
  pub source_counts: BTreeMap<String, usize>,
  pub frequent_patterns: Vec<FrequentPattern>,
  pub total_events: usize,
  pub start_time: Option<DateTime<Utc>>,
  pub end_time: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Episodes
// ---------------------------------------------------------------------------

/// A temporally and/or correlation-coherent run of events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
  pub id: u64,
  /// Member event ids, in input order.
  pub event_ids: Vec<EventId>,
  pub start_time: Option<DateTime<Utc>>,
  pub end_time: Option<DateTime<Utc>>,
  pub correlation_ids: BTreeSet<String>,
  /// First ERROR/FATAL member, then the max-severity member if different.
  pub highlights: Vec<EventId>,
  pub max_severity: Severity,
}

impl Episode {
  pub fn len(&self) -> usize {
    self.event_ids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.event_ids.is_empty()
  }
}

// ---------------------------------------------------------------------------
// Anomalies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
  ErrorBurst,
  RestartLoop,
  /// Reserved; no detector emits it yet.
  MissingHeartbeat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
  pub kind: AnomalyKind,
  pub description: String,
  pub evidence_ids: Vec<EventId>,
  /// 0.0..=1.0
  pub confidence: f64,
  pub start_time: Option<DateTime<Utc>>,
  pub end_time: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FindingSeverity {
  Low,
  Medium,
  High,
  Critical,
}

impl fmt::Display for FindingSeverity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Low => "LOW",
      Self::Medium => "MEDIUM",
      Self::High => "HIGH",
      Self::Critical => "CRITICAL",
    })
  }
}

/// One event cited by a finding, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
  pub event_id: EventId,
  pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
  pub id: String,
  pub title: String,
  pub summary: String,
  pub severity: FindingSeverity,
  pub confidence: f64,
  pub evidence: Vec<Evidence>,
  pub start_time: Option<DateTime<Utc>>,
  pub end_time: Option<DateTime<Utc>>,
}

impl Finding {
  pub fn new(
    id: impl Into<String>,
    title: impl Into<String>,
    severity: FindingSeverity,
  ) -> Self {
    Self {
      id: id.into(),
      title: title.into(),
      summary: String::new(),
      severity,
      confidence: 0.0,
      evidence: Vec::new(),
      start_time: None,
      end_time: None,
    }
  }

  pub fn add_evidence(&mut self, event_id: EventId, reason: impl Into<String>) {
    self.evidence.push(Evidence {
      event_id,
      reason: reason.into(),
    });
  }
}
