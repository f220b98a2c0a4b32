//! Pipeline driver: events in, stats/episodes/anomalies/findings out.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::anomaly::{ErrorBurstDetector, RestartLoopDetector};
use crate::config::Config;
use crate::episode::EpisodeBuilder;
use crate::error::EngineError;
use crate::index::EventIndex;
use crate::rules::{RuleContext, RuleRegistry};
use crate::stats::StatsBuilder;
use crate::types::*;

/// Everything one analysis run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
  pub stats: Stats,
  pub episodes: Vec<Episode>,
  pub anomalies: Vec<Anomaly>,
  /// Rule output in rule-priority order, not ranked by severity.
  pub findings: Vec<Finding>,
}

impl Analysis {
  /// Findings with the most severe first; equal severities keep rule order.
  pub fn findings_by_severity(&self) -> Vec<Finding> {
    let mut sorted = self.findings.clone();
    sorted.sort_by(|a, b| b.severity.cmp(&a.severity));
    sorted
  }
}

/// Stateless across calls: each `analyze` sees only the events it is given.
pub struct Engine {
  config: Config,
  stats: StatsBuilder,
  episodes: EpisodeBuilder,
  bursts: ErrorBurstDetector,
  restarts: RestartLoopDetector,
  registry: RuleRegistry,
}

impl Engine {
  /// Validates `config` and loads the built-in rules.
  pub fn new(config: Config) -> Result<Self, EngineError> {
    config.validate()?;
    Ok(Self::from_valid(config))
  }

  pub fn with_defaults() -> Self {
    Self::from_valid(Config::default())
  }

  fn from_valid(config: Config) -> Self {
    Self {
      stats: StatsBuilder::new(config.stats.clone()),
      episodes: EpisodeBuilder::new(config.episodes.clone()),
      bursts: ErrorBurstDetector::new(config.error_burst.clone()),
      restarts: RestartLoopDetector::new(config.restart_loop.clone()),
      registry: RuleRegistry::with_builtin_rules(&config.rules),
      config,
    }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn registry(&self) -> &RuleRegistry {
    &self.registry
  }

  /// For registering custom rules alongside (or instead of) the built-ins.
  pub fn registry_mut(&mut self) -> &mut RuleRegistry {
    &mut self.registry
  }

  /// Lookup tables over `events`, using the configured index bucket width.
  pub fn index(&self, events: &[Event]) -> EventIndex {
    let mut index = EventIndex::new(self.config.index.clone());
    index.build(events);
    index
  }

  pub fn analyze(&self, events: &[Event]) -> Analysis {
    let stats = self.stats.build(events);
    let episodes = self.episodes.build(events);

    let mut anomalies = self.bursts.detect(events, &stats);
    anomalies.extend(self.restarts.detect(events));

    let ctx = RuleContext::default()
      .with_events(events)
      .with_stats(&stats)
      .with_episodes(&episodes)
      .with_anomalies(&anomalies);
    let findings = self.registry.evaluate_all(&ctx);

    info!(
      events = events.len(),
      episodes = episodes.len(),
      anomalies = anomalies.len(),
      findings = findings.len(),
      "analysis complete"
    );

    Analysis {
      stats,
      episodes,
      anomalies,
      findings,
    }
  }
}
