//! Engine configuration with sane defaults.
//!
//! Every stage reads its own section; a partial JSON document fills the
//! remaining fields from `Default`.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Top-level configuration: one section per pipeline stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  pub stats: StatsConfig,
  pub index: IndexConfig,
  pub episodes: EpisodeConfig,
  pub error_burst: ErrorBurstConfig,
  pub restart_loop: RestartLoopConfig,
  pub rules: RuleConfig,
}

impl Config {
  /// Parse a (possibly partial) JSON document and validate it.
  pub fn from_json(json: &str) -> Result<Self, EngineError> {
    let config: Config = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
  }

  /// Reject values that would make a stage meaningless.
  pub fn validate(&self) -> Result<(), EngineError> {
    check_bucket("stats.bucket_secs", self.stats.bucket_secs)?;
    check_bucket("index.bucket_secs", self.index.bucket_secs)?;
    let m = self.error_burst.threshold_multiplier;
    if !m.is_finite() || m <= 0.0 {
      return Err(EngineError::invalid_config(
        "error_burst.threshold_multiplier",
        "must be a finite number > 0",
      ));
    }
    if self.restart_loop.min_restart_count == 0 {
      return Err(EngineError::invalid_config(
        "restart_loop.min_restart_count",
        "must be > 0",
      ));
    }
    if self.restart_loop.window_secs == 0 {
      return Err(EngineError::invalid_config("restart_loop.window_secs", "must be > 0"));
    }
    if self.rules.change_lookback_secs == 0 {
      return Err(EngineError::invalid_config("rules.change_lookback_secs", "must be > 0"));
    }
    Ok(())
  }
}

/// Statistics aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
  /// Width of one time-series bucket, in seconds.
  pub bucket_secs: u64,
  /// How many frequent patterns to keep.
  pub top_n_patterns: usize,
  /// Messages shorter than this (in chars) are not pattern-counted.
  pub min_pattern_length: usize,
}

impl StatsConfig {
  pub fn bucket_width(&self) -> Duration {
    secs(self.bucket_secs)
  }
}

impl Default for StatsConfig {
  fn default() -> Self {
    Self {
      bucket_secs: 60,
      top_n_patterns: 10,
      min_pattern_length: 10,
    }
  }
}

/// Event index time buckets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
  pub bucket_secs: u64,
}

impl Default for IndexConfig {
  fn default() -> Self {
    Self { bucket_secs: 60 }
  }
}

/// Episode segmentation and merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeConfig {
  /// Consecutive timestamped events further apart than this start a new episode.
  pub time_gap_secs: u64,
  /// Merge adjacent episodes whose correlation-id sets intersect.
  pub merge_by_correlation: bool,
}

impl EpisodeConfig {
  pub fn time_gap(&self) -> Duration {
    secs(self.time_gap_secs)
  }
}

impl Default for EpisodeConfig {
  fn default() -> Self {
    Self {
      time_gap_secs: 300,
      merge_by_correlation: true,
    }
  }
}

/// Error burst detection against the per-bucket baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorBurstConfig {
  /// A burst bucket must hold at least baseline * multiplier errors.
  pub threshold_multiplier: f64,
  /// ...and at least this many in absolute terms.
  pub min_errors_for_burst: usize,
}

impl Default for ErrorBurstConfig {
  fn default() -> Self {
    Self {
      threshold_multiplier: 3.0,
      min_errors_for_burst: 10,
    }
  }
}

/// Restart loop detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartLoopConfig {
  pub min_restart_count: usize,
  /// Window measured from the anchor restart, in seconds.
  pub window_secs: u64,
  /// Case-insensitive substrings marking a restart-like message.
  pub restart_keywords: Vec<String>,
}

impl RestartLoopConfig {
  pub fn window(&self) -> Duration {
    secs(self.window_secs)
  }
}

impl Default for RestartLoopConfig {
  fn default() -> Self {
    Self {
      min_restart_count: 3,
      window_secs: 600,
      restart_keywords: strings(&[
        "starting",
        "started",
        "shutdown",
        "stopping",
        "stopped",
        "restarting",
        "restart",
        "initializing",
        "initialized",
      ]),
    }
  }
}

/// Keyword lists and windows used by the built-in rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
  pub change_keywords: Vec<String>,
  /// How far before a burst a change event may sit, in seconds.
  pub change_lookback_secs: u64,
  /// Max burst ERROR events attached as evidence to one finding.
  pub max_burst_evidence: usize,
  pub retry_keywords: Vec<String>,
  pub timeout_keywords: Vec<String>,
}

impl RuleConfig {
  pub fn change_lookback(&self) -> Duration {
    secs(self.change_lookback_secs)
  }
}

impl Default for RuleConfig {
  fn default() -> Self {
    Self {
      change_keywords: strings(&[
        "deploy",
        "deployment",
        "config",
        "configuration",
        "release",
        "rollout",
        "upgrade",
        "migration",
      ]),
      change_lookback_secs: 1800,
      max_burst_evidence: 5,
      retry_keywords: strings(&["retry", "retrying", "attempt"]),
      timeout_keywords: strings(&["timeout", "timed out"]),
    }
  }
}

/// Case-insensitive substring match against any keyword.
pub(crate) fn matches_any(message: &str, keywords: &[String]) -> bool {
  let msg = message.to_lowercase();
  keywords
    .iter()
    .any(|k| !k.is_empty() && msg.contains(&k.to_lowercase()))
}

/// Upper bound for bucket widths, matching the clamp in `secs`.
pub const MAX_BUCKET_SECS: u64 = u32::MAX as u64;

fn check_bucket(field: &str, bucket_secs: u64) -> Result<(), EngineError> {
  if bucket_secs == 0 || bucket_secs > MAX_BUCKET_SECS {
    return Err(EngineError::invalid_config(field, "must be in 1..=4294967295"));
  }
  Ok(())
}

// Clamped to ~136 years so chrono never overflows.
fn secs(n: u64) -> Duration {
  Duration::seconds(i64::from(u32::try_from(n).unwrap_or(u32::MAX)))
}

fn strings(items: &[&str]) -> Vec<String> {
  items.iter().map(|s| (*s).to_string()).collect()
}
