//! Republish restart-loop anomalies as critical findings.

use super::{Rule, RuleContext};
use crate::types::{AnomalyKind, Finding, FindingSeverity};

#[derive(Debug, Clone, Copy, Default)]
pub struct CrashLoopRule;

impl Rule for CrashLoopRule {
  fn id(&self) -> &str {
    "crash-loop"
  }

  fn name(&self) -> &str {
    "Crash Loop Detection"
  }

  fn priority(&self) -> i32 {
    90
  }

  fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
    let Some(anomalies) = ctx.anomalies else {
      return Vec::new();
    };

    anomalies
      .iter()
      .filter(|a| a.kind == AnomalyKind::RestartLoop)
      .enumerate()
      .map(|(n, anomaly)| {
        let mut finding = Finding::new(
          format!("crash-loop-{}", n + 1),
          "Crash Loop Detected",
          FindingSeverity::Critical,
        );
        finding.summary = anomaly.description.clone();
        finding.confidence = anomaly.confidence;
        finding.start_time = anomaly.start_time;
        finding.end_time = anomaly.end_time;
        for &id in &anomaly.evidence_ids {
          finding.add_evidence(id, "Restart event");
        }
        finding
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::Anomaly;

  fn anomaly(kind: AnomalyKind, ids: Vec<u64>, confidence: f64) -> Anomaly {
    Anomaly {
      kind,
      description: "Restart loop detected: 3 restarts in 10 minutes".into(),
      evidence_ids: ids,
      confidence,
      start_time: None,
      end_time: None,
    }
  }

  #[test]
  fn restart_loops_become_critical_findings() {
    let anomalies = vec![
      anomaly(AnomalyKind::ErrorBurst, vec![9], 0.9),
      anomaly(AnomalyKind::RestartLoop, vec![1, 2, 3], 0.5),
      anomaly(AnomalyKind::RestartLoop, vec![7, 8, 9], 0.75),
    ];
    let ctx = RuleContext::default().with_anomalies(&anomalies);
    let findings = CrashLoopRule.evaluate(&ctx);

    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0].id, "crash-loop-1");
    assert_eq!(findings[1].id, "crash-loop-2");
    assert_eq!(findings[0].severity, FindingSeverity::Critical);
    assert!((findings[0].confidence - 0.5).abs() < f64::EPSILON);
    assert_eq!(findings[0].evidence.len(), 3);
    assert_eq!(findings[0].evidence[0].reason, "Restart event");
    assert_eq!(findings[1].evidence[2].event_id, 9);
  }

  #[test]
  fn no_anomalies_no_findings() {
    assert!(CrashLoopRule.evaluate(&RuleContext::default()).is_empty());
    let ctx = RuleContext::default().with_anomalies(&[]);
    assert!(CrashLoopRule.evaluate(&ctx).is_empty());
  }
}
