//! Rule framework: a rule reads whatever parts of the analysis it needs from
//! a `RuleContext` and turns them into findings.
//!
//! Rules are stateless per call. A rule whose inputs are absent from the
//! context returns no findings rather than failing the pass.

mod burst_after_change;
mod crash_loop;
mod registry;
mod retry_timeout;

pub use burst_after_change::ErrorBurstAfterChangeRule;
pub use crash_loop::CrashLoopRule;
pub use registry::RuleRegistry;
pub use retry_timeout::RetryToTimeoutRule;

use crate::types::{Anomaly, Episode, Event, Finding, Stats};

/// Borrowed view of one analysis run. Any part may be absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleContext<'a> {
  pub events: Option<&'a [Event]>,
  pub stats: Option<&'a Stats>,
  pub episodes: Option<&'a [Episode]>,
  pub anomalies: Option<&'a [Anomaly]>,
}

impl<'a> RuleContext<'a> {
  pub fn with_events(mut self, events: &'a [Event]) -> Self {
    self.events = Some(events);
    self
  }

  pub fn with_stats(mut self, stats: &'a Stats) -> Self {
    self.stats = Some(stats);
    self
  }

  pub fn with_episodes(mut self, episodes: &'a [Episode]) -> Self {
    self.episodes = Some(episodes);
    self
  }

  pub fn with_anomalies(mut self, anomalies: &'a [Anomaly]) -> Self {
    self.anomalies = Some(anomalies);
    self
  }
}

/// A named, prioritized policy producing findings.
pub trait Rule: Send + Sync {
  /// Stable and unique within a registry.
  fn id(&self) -> &str;

  fn name(&self) -> &str;

  /// Higher runs first.
  fn priority(&self) -> i32 {
    0
  }

  fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding>;
}
