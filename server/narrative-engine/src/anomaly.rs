//! Anomaly detectors: error bursts against the per-bucket baseline, and
//! clusters of restart-like messages.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::{matches_any, ErrorBurstConfig, RestartLoopConfig};
use crate::stats::bucket_floor;
use crate::types::{Anomaly, AnomalyKind, Event, Severity, Stats, TimeSeries};

/// Flags ERROR buckets that stand out from the average populated bucket.
#[derive(Debug, Clone, Default)]
pub struct ErrorBurstDetector {
  config: ErrorBurstConfig,
}

impl ErrorBurstDetector {
  pub fn new(config: ErrorBurstConfig) -> Self {
    Self { config }
  }

  /// One ERROR_BURST anomaly per qualifying bucket, in bucket order.
  /// `events` only supplies evidence ids; detection runs on `stats`.
  pub fn detect(&self, events: &[Event], stats: &Stats) -> Vec<Anomaly> {
    let Some(series) = stats.series(Severity::Error) else {
      return Vec::new();
    };
    let baseline = baseline_rate(series);
    let threshold = baseline * self.config.threshold_multiplier;
    let width = series.bucket_width();

    let bursts: Vec<Anomaly> = series
      .points
      .iter()
      .filter(|p| p.count >= self.config.min_errors_for_burst && p.count as f64 >= threshold)
      .map(|p| {
        let start = p.timestamp;
        let ratio = if threshold > 0.0 {
          p.count as f64 / threshold
        } else {
          f64::INFINITY
        };
        Anomaly {
          kind: AnomalyKind::ErrorBurst,
          description: format!(
            "Error burst detected: {} errors in {} (baseline {:.2} per bucket)",
            p.count,
            describe_width(series.bucket_secs),
            baseline
          ),
          evidence_ids: events
            .iter()
            .filter(|e| e.severity == Severity::Error)
            .filter(|e| {
              e.valid_time()
                .is_some_and(|t| bucket_floor(&t, series.bucket_secs) == start)
            })
            .map(|e| e.id)
            .collect(),
          confidence: (ratio / 2.0).min(1.0),
          start_time: Some(start),
          end_time: start.checked_add_signed(width),
        }
      })
      .collect();

    debug!(
      buckets = series.points.len(),
      baseline,
      bursts = bursts.len(),
      "error burst detection"
    );
    bursts
  }
}

/// Total ERROR count / number of populated ERROR buckets (0 when none).
pub fn baseline_rate(series: &TimeSeries) -> f64 {
  if series.points.is_empty() {
    return 0.0;
  }
  series.total_count() as f64 / series.points.len() as f64
}

fn describe_width(bucket_secs: u64) -> String {
  match bucket_secs {
    60 => "1 minute".to_string(),
    s if s % 60 == 0 => format!("{} minutes", s / 60),
    1 => "1 second".to_string(),
    s => format!("{s} seconds"),
  }
}

/// Finds clusters of restart-like messages inside a time window.
#[derive(Debug, Clone, Default)]
pub struct RestartLoopDetector {
  config: RestartLoopConfig,
}

impl RestartLoopDetector {
  pub fn new(config: RestartLoopConfig) -> Self {
    Self { config }
  }

  pub fn is_restart_event(&self, event: &Event) -> bool {
    matches_any(&event.message, &self.config.restart_keywords)
  }

  /// Greedy, non-overlapping clusters anchored on each timestamped restart.
  ///
  /// Followers are later restarts (input order) whose valid timestamp is at
  /// most `anchor + window`. Input order is not time order, so a follower may
  /// predate its anchor. Untimed restarts are skipped; the first timed restart
  /// past the window ends the sweep.
  pub fn detect(&self, events: &[Event]) -> Vec<Anomaly> {
    let restarts: Vec<&Event> = events.iter().filter(|e| self.is_restart_event(e)).collect();
    let min = self.config.min_restart_count.max(1);
    if restarts.len() < min {
      debug!(restarts = restarts.len(), min, "too few restarts for a loop");
      return Vec::new();
    }

    let window = self.config.window();
    let mut loops = Vec::new();
    let mut i = 0;
    while i < restarts.len() {
      let anchor = restarts[i];
      let Some(anchor_time) = anchor.valid_time() else {
        i += 1;
        continue;
      };
      let window_end = anchor_time + window;

      let mut cluster: Vec<(&Event, DateTime<Utc>)> = vec![(anchor, anchor_time)];
      let mut last = i;
      for (j, follower) in restarts.iter().enumerate().skip(i + 1) {
        let Some(t) = follower.valid_time() else {
          continue;
        };
        if t > window_end {
          break;
        }
        cluster.push((follower, t));
        last = j;
      }

      if cluster.len() >= min {
        let start_time = cluster.iter().map(|(_, t)| *t).min();
        let end_time = cluster.iter().map(|(_, t)| *t).max();
        loops.push(Anomaly {
          kind: AnomalyKind::RestartLoop,
          description: format!(
            "Restart loop detected: {} restarts in {}",
            cluster.len(),
            describe_width(self.config.window_secs)
          ),
          evidence_ids: cluster.iter().map(|(e, _)| e.id).collect(),
          confidence: (cluster.len() as f64 / (min as f64 * 2.0)).min(1.0),
          start_time,
          end_time,
        });
        i = last + 1;
      } else {
        i += 1;
      }
    }

    debug!(restarts = restarts.len(), loops = loops.len(), "restart loop detection");
    loops
  }
}
