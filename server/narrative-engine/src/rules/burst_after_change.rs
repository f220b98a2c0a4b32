//! Error bursts that shortly follow a deployment or config change.

use chrono::{DateTime, Utc};

use super::{Rule, RuleContext};
use crate::config::{matches_any, RuleConfig};
use crate::types::{Anomaly, AnomalyKind, Event, Finding, FindingSeverity, Severity};

#[derive(Debug, Clone, Default)]
pub struct ErrorBurstAfterChangeRule {
  config: RuleConfig,
}

impl ErrorBurstAfterChangeRule {
  pub fn new(config: RuleConfig) -> Self {
    Self { config }
  }

  fn is_change(&self, event: &Event) -> bool {
    matches_any(&event.message, &self.config.change_keywords)
  }

  /// Closest timed change strictly before `burst_start` and within the lookback.
  /// The earliest candidate wins equal gaps.
  fn nearest_change<'e>(
    &self,
    changes: &[(&'e Event, DateTime<Utc>)],
    burst_start: DateTime<Utc>,
  ) -> Option<(&'e Event, DateTime<Utc>)> {
    let lookback = self.config.change_lookback();
    let mut best: Option<(&Event, DateTime<Utc>)> = None;
    for &(event, at) in changes {
      if at >= burst_start || burst_start - at > lookback {
        continue;
      }
      if best.map_or(true, |(_, b)| burst_start - at < burst_start - b) {
        best = Some((event, at));
      }
    }
    best
  }

  fn finding(
    &self,
    n: usize,
    events: &[Event],
    anomaly: &Anomaly,
    change: &Event,
    change_at: DateTime<Utc>,
    burst_start: DateTime<Utc>,
  ) -> Finding {
    let gap_secs = (burst_start - change_at).num_seconds();
    let lookback_secs = self.config.change_lookback().num_seconds() as f64;

    let mut finding = Finding::new(
      format!("error-burst-after-change-{n}"),
      "Error Burst Following Deployment/Config Change",
      FindingSeverity::High,
    );
    finding.summary = format!(
      "Error spike detected {gap_secs} seconds after a deployment or configuration change"
    );
    finding.confidence = (1.0 - gap_secs as f64 / lookback_secs).max(0.5);
    finding.start_time = Some(change_at);
    finding.end_time = anomaly.end_time;

    finding.add_evidence(change.id, "Deployment or config change");
    let in_burst = events
      .iter()
      .filter(|e| e.severity == Severity::Error)
      .filter(|e| {
        e.valid_time().is_some_and(|t| {
          t >= burst_start && anomaly.end_time.map_or(true, |end| t < end)
        })
      })
      .take(self.config.max_burst_evidence);
    for event in in_burst {
      finding.add_evidence(event.id, "Error during burst");
    }
    finding
  }
}

impl Rule for ErrorBurstAfterChangeRule {
  fn id(&self) -> &str {
    "error-burst-after-change"
  }

  fn name(&self) -> &str {
    "Error Burst After Deployment/Config Change"
  }

  fn priority(&self) -> i32 {
    85
  }

  fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
    let (Some(events), Some(anomalies)) = (ctx.events, ctx.anomalies) else {
      return Vec::new();
    };

    let changes: Vec<_> = events
      .iter()
      .filter(|e| self.is_change(e))
      .filter_map(|e| e.valid_time().map(|t| (e, t)))
      .collect();
    if changes.is_empty() {
      return Vec::new();
    }

    let mut findings = Vec::new();
    for anomaly in anomalies.iter().filter(|a| a.kind == AnomalyKind::ErrorBurst) {
      let Some(burst_start) = anomaly.start_time else {
        continue;
      };
      if let Some((change, at)) = self.nearest_change(&changes, burst_start) {
        let n = findings.len() + 1;
        findings.push(self.finding(n, events, anomaly, change, at, burst_start));
      }
    }
    findings
  }
}
