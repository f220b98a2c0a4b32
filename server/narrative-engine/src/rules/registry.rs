//! Ordered rule collection with id lookup.

use std::collections::HashMap;

use tracing::debug;

use super::{CrashLoopRule, ErrorBurstAfterChangeRule, RetryToTimeoutRule, Rule, RuleContext};
use crate::config::RuleConfig;
use crate::error::EngineError;
use crate::types::Finding;

/// Rules kept in priority order (descending; ties keep registration order).
#[derive(Default)]
pub struct RuleRegistry {
  rules: Vec<Box<dyn Rule>>,
  by_id: HashMap<String, usize>,
}

impl RuleRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registry holding the built-in rules.
  pub fn with_builtin_rules(config: &RuleConfig) -> Self {
    let mut registry = Self::new();
    let builtins: [Box<dyn Rule>; 3] = [
      Box::new(CrashLoopRule),
      Box::new(ErrorBurstAfterChangeRule::new(config.clone())),
      Box::new(RetryToTimeoutRule::new(config.clone())),
    ];
    for rule in builtins {
      registry.insert(rule);
    }
    registry
  }

  /// Add a rule and re-sort. Ids must be unique.
  pub fn register(&mut self, rule: Box<dyn Rule>) -> Result<(), EngineError> {
    if self.by_id.contains_key(rule.id()) {
      return Err(EngineError::DuplicateRule(rule.id().to_string()));
    }
    self.insert(rule);
    Ok(())
  }

  fn insert(&mut self, rule: Box<dyn Rule>) {
    self.rules.push(rule);
    // Stable: equal priorities keep registration order.
    self.rules.sort_by_key(|r| std::cmp::Reverse(r.priority()));
    self.by_id = self
      .rules
      .iter()
      .enumerate()
      .map(|(i, r)| (r.id().to_string(), i))
      .collect();
  }

  pub fn get(&self, id: &str) -> Option<&dyn Rule> {
    self.by_id.get(id).map(|&i| self.rules[i].as_ref())
  }

  /// Rules in evaluation order.
  pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
    self.rules.iter().map(|r| r.as_ref())
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  pub fn clear(&mut self) {
    self.rules.clear();
    self.by_id.clear();
  }

  /// Each rule's findings concatenated in priority order. No ranking or dedup.
  pub fn evaluate_all(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    for rule in &self.rules {
      let out = rule.evaluate(ctx);
      debug!(rule = rule.id(), findings = out.len(), "evaluated rule");
      findings.extend(out);
    }
    findings
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::FindingSeverity;

  struct Fixed {
    id: &'static str,
    priority: i32,
  }

  impl Rule for Fixed {
    fn id(&self) -> &str {
      self.id
    }

    fn name(&self) -> &str {
      "fixed"
    }

    fn priority(&self) -> i32 {
      self.priority
    }

    fn evaluate(&self, _ctx: &RuleContext<'_>) -> Vec<Finding> {
      vec![Finding::new(format!("{}-1", self.id), "fixed", FindingSeverity::Low)]
    }
  }

  fn fixed(id: &'static str, priority: i32) -> Box<dyn Rule> {
    Box::new(Fixed { id, priority })
  }

  fn order(registry: &RuleRegistry) -> Vec<String> {
    registry.rules().map(|r| r.id().to_string()).collect()
  }

  #[test]
  fn sorts_by_priority_stable() {
    let mut registry = RuleRegistry::new();
    registry.register(fixed("low", 1)).unwrap();
    registry.register(fixed("tie-a", 50)).unwrap();
    registry.register(fixed("high", 99)).unwrap();
    registry.register(fixed("tie-b", 50)).unwrap();
    assert_eq!(order(&registry), vec!["high", "tie-a", "tie-b", "low"]);
  }

  #[test]
  fn lookup_by_id_after_resort() {
    let mut registry = RuleRegistry::new();
    registry.register(fixed("a", 1)).unwrap();
    registry.register(fixed("b", 2)).unwrap();
    assert_eq!(registry.get("a").map(|r| r.priority()), Some(1));
    assert_eq!(registry.get("b").map(|r| r.priority()), Some(2));
    assert!(registry.get("missing").is_none());
  }

  #[test]
  fn duplicate_id_rejected() {
    let mut registry = RuleRegistry::new();
    registry.register(fixed("a", 1)).unwrap();
    let err = registry.register(fixed("a", 5)).unwrap_err();
    assert!(matches!(err, EngineError::DuplicateRule(id) if id == "a"));
    assert_eq!(registry.len(), 1);
  }

  #[test]
  fn evaluate_all_concatenates_in_priority_order() {
    let mut registry = RuleRegistry::new();
    registry.register(fixed("second", 10)).unwrap();
    registry.register(fixed("first", 20)).unwrap();
    let ids: Vec<_> = registry
      .evaluate_all(&RuleContext::default())
      .into_iter()
      .map(|f| f.id)
      .collect();
    assert_eq!(ids, vec!["first-1", "second-1"]);
  }

  #[test]
  fn clear_empties_everything() {
    let mut registry = RuleRegistry::with_builtin_rules(&RuleConfig::default());
    assert_eq!(registry.len(), 3);
    registry.clear();
    assert!(registry.is_empty());
    assert!(registry.get("crash-loop").is_none());
  }

  #[test]
  fn builtins_ordered_by_priority() {
    let registry = RuleRegistry::with_builtin_rules(&RuleConfig::default());
    assert_eq!(
      order(&registry),
      vec!["crash-loop", "error-burst-after-change", "retry-to-timeout"]
    );
  }

  #[test]
  fn builtins_tolerate_empty_context() {
    let registry = RuleRegistry::with_builtin_rules(&RuleConfig::default());
    for rule in registry.rules() {
      assert!(rule.evaluate(&RuleContext::default()).is_empty(), "{}", rule.id());
    }
  }
}
