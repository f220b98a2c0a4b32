//! Runs of retry messages that end in a timeout.

use super::{Rule, RuleContext};
use crate::config::{matches_any, RuleConfig};
use crate::types::{Event, Finding, FindingSeverity};

#[derive(Debug, Clone, Default)]
pub struct RetryToTimeoutRule {
  config: RuleConfig,
}

impl RetryToTimeoutRule {
  pub fn new(config: RuleConfig) -> Self {
    Self { config }
  }

  fn is_retry(&self, event: &Event) -> bool {
    matches_any(&event.message, &self.config.retry_keywords)
  }

  fn is_timeout(&self, event: &Event) -> bool {
    matches_any(&event.message, &self.config.timeout_keywords)
  }

  fn finding(&self, n: usize, retries: &[Event], timeout: &Event) -> Finding {
    let mut finding = Finding::new(
      format!("retry-timeout-{n}"),
      "Retries Leading to Timeout",
      FindingSeverity::High,
    );
    finding.summary = format!(
      "Detected {} retry attempts followed by a timeout",
      retries.len()
    );
    finding.confidence = (0.5 + 0.1 * retries.len() as f64).min(1.0);
    finding.start_time = retries.first().and_then(Event::valid_time);
    finding.end_time = timeout.valid_time();
    for retry in retries {
      finding.add_evidence(retry.id, "Retry attempt");
    }
    finding.add_evidence(timeout.id, "Final timeout");
    finding
  }
}

impl Rule for RetryToTimeoutRule {
  fn id(&self) -> &str {
    "retry-to-timeout"
  }

  fn name(&self) -> &str {
    "Retry Leading to Timeout"
  }

  fn priority(&self) -> i32 {
    70
  }

  fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
    let Some(events) = ctx.events else {
      return Vec::new();
    };

    let mut findings = Vec::new();
    let mut i = 0;
    while i < events.len() {
      if !self.is_retry(&events[i]) {
        i += 1;
        continue;
      }

      let mut j = i + 1;
      while j < events.len() && self.is_retry(&events[j]) {
        j += 1;
      }

      match events.get(j) {
        Some(timeout) if self.is_timeout(timeout) => {
          findings.push(self.finding(findings.len() + 1, &events[i..j], timeout));
          i = j + 1;
        }
        // Any later start inside this run ends at the same non-timeout event.
        _ => i = j,
      }
    }
    findings
  }
}
