//! Integration tests for the narrative engine.

use chrono::{DateTime, Duration, TimeZone, Utc};
use narrative_engine::rules::{CrashLoopRule, ErrorBurstAfterChangeRule, RetryToTimeoutRule};
use narrative_engine::types::{AnomalyKind, FindingSeverity, SourceRef};
use narrative_engine::{
  Analysis, Config, Engine, EngineError, Event, Rule, RuleContext, Severity,
};

fn t0() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap()
}

fn at(secs: i64) -> DateTime<Utc> {
  t0() + Duration::seconds(secs)
}

/// A deploy, quiet traffic, a burst of errors five minutes later, then a
/// retry run that ends in a timeout.
fn incident() -> Vec<Event> {
  let mut events = vec![Event::new(1, Severity::Info, "Deployment of api v2.4.0 finished")
    .with_time(at(0))
    .with_source(SourceRef::new("deploy.log", 1, 1))];
  for minute in 1..=4 {
    events.push(
      Event::new(events.len() as u64 + 1, Severity::Error, "cache miss for key 17")
        .with_time(at(minute * 60))
        .with_source(SourceRef::new("api.log", 10, 10)),
    );
  }
  for i in 0..12 {
    events.push(
      Event::new(events.len() as u64 + 1, Severity::Error, "upstream returned 503")
        .with_time(at(300 + i))
        .with_tag("request_id", "req-42")
        .with_source(SourceRef::new("api.log", 20, 20)),
    );
  }
  events.extend([
    Event::new(18, Severity::Warn, "retrying upstream call").with_time(at(320)),
    Event::new(19, Severity::Warn, "retry 2 of 2").with_time(at(321)),
    Event::new(20, Severity::Error, "upstream request timed out").with_time(at(330)),
  ]);
  events
}

#[test]
fn full_pipeline_over_incident() {
  let events = incident();
  let analysis = Engine::with_defaults().analyze(&events);

  assert_eq!(analysis.stats.total_events, events.len());
  assert_eq!(analysis.stats.error_count(), 17);
  assert_eq!(analysis.stats.source_counts.get("api.log"), Some(&16));
  assert_eq!(analysis.stats.start_time, Some(at(0)));
  assert_eq!(analysis.stats.end_time, Some(at(330)));

  // Gaps never exceed five minutes, so one episode covers everything.
  assert_eq!(analysis.episodes.len(), 1);
  assert_eq!(analysis.episodes[0].len(), events.len());
  assert_eq!(analysis.episodes[0].max_severity, Severity::Error);
  assert!(analysis.episodes[0].correlation_ids.contains("req-42"));

  let bursts: Vec<_> = analysis
    .anomalies
    .iter()
    .filter(|a| a.kind == AnomalyKind::ErrorBurst)
    .collect();
  assert_eq!(bursts.len(), 1);
  assert_eq!(bursts[0].start_time, Some(at(300)));

  let ids: Vec<_> = analysis.findings.iter().map(|f| f.id.as_str()).collect();
  assert_eq!(ids, vec!["error-burst-after-change-1", "retry-timeout-1"]);

  let change = &analysis.findings[0];
  assert_eq!(change.start_time, Some(at(0)));
  assert_eq!(change.evidence[0].event_id, 1);
  assert_eq!(change.evidence.len(), 6);

  let retry = &analysis.findings[1];
  let evidence: Vec<_> = retry.evidence.iter().map(|e| e.event_id).collect();
  assert_eq!(evidence, vec![18, 19, 20]);
}

#[test]
fn burst_scenario_with_custom_thresholds() {
  let mut events = Vec::new();
  for minute in 0..10 {
    events.push(Event::new(minute as u64 + 1, Severity::Error, "e").with_time(at(minute * 60)));
  }
  for i in 0..10 {
    events.push(Event::new(11 + i as u64, Severity::Error, "e").with_time(at(600 + i)));
  }

  let config =
    Config::from_json(r#"{"error_burst": {"min_errors_for_burst": 5, "threshold_multiplier": 2.0}}"#)
      .unwrap();
  let analysis = Engine::new(config).unwrap().analyze(&events);

  assert_eq!(analysis.anomalies.len(), 1);
  let burst = &analysis.anomalies[0];
  assert_eq!(burst.kind, AnomalyKind::ErrorBurst);
  assert_eq!(burst.start_time, Some(at(600)));
  assert!(burst.confidence > 0.0);
  assert_eq!(burst.evidence_ids, (11..=20).collect::<Vec<_>>());
}

#[test]
fn single_episode_highlight_scenario() {
  let events = vec![
    Event::new(1, Severity::Info, "begin").with_time(at(0)),
    Event::new(2, Severity::Error, "first failure").with_time(at(1)),
    Event::new(3, Severity::Error, "second failure").with_time(at(2)),
  ];
  let analysis = Engine::with_defaults().analyze(&events);
  assert_eq!(analysis.episodes.len(), 1);
  assert_eq!(analysis.episodes[0].highlights, vec![2]);
  assert_eq!(analysis.episodes[0].max_severity, Severity::Error);
}

#[test]
fn crash_loop_is_ranked_first() {
  let mut events = incident();
  let base = events.len() as u64;
  for i in 0..3 {
    events.push(
      Event::new(base + 1 + i, Severity::Info, "worker restarting").with_time(at(400 + i as i64 * 30)),
    );
  }
  let analysis = Engine::with_defaults().analyze(&events);

  assert_eq!(analysis.findings[0].id, "crash-loop-1");
  let ranked = analysis.findings_by_severity();
  assert_eq!(ranked[0].severity, FindingSeverity::Critical);
  assert!(ranked.windows(2).all(|w| w[0].severity >= w[1].severity));
}

#[test]
fn time_gap_splits_episodes() {
  let events = vec![
    Event::new(1, Severity::Info, "a").with_time(at(0)),
    Event::new(2, Severity::Info, "b").with_time(at(301)),
    Event::new(3, Severity::Info, "c").with_time(at(302)),
  ];
  let analysis = Engine::with_defaults().analyze(&events);
  let members: Vec<_> = analysis.episodes.iter().map(|e| e.event_ids.clone()).collect();
  assert_eq!(members, vec![vec![1], vec![2, 3]]);
}

#[test]
fn analysis_serializes_and_round_trips() {
  let analysis = Engine::with_defaults().analyze(&incident());
  let json = serde_json::to_string(&analysis).unwrap();

  assert!(json.contains(r#""severity":"HIGH""#));
  assert!(json.contains(r#""kind":"ERROR_BURST""#));
  assert!(json.contains(r#""ERROR":17"#));

  let back: Analysis = serde_json::from_str(&json).unwrap();
  assert_eq!(back.stats, analysis.stats);
  assert_eq!(back.episodes, analysis.episodes);
  let ids = |a: &Analysis| a.findings.iter().map(|f| f.id.clone()).collect::<Vec<_>>();
  assert_eq!(ids(&back), ids(&analysis));
}

#[test]
fn events_parse_from_json_lines() {
  let line = r#"{"id": 7, "message": "boot", "severity": "WARN",
    "timestamp": {"time": "2025-01-15T10:00:00Z", "confidence": 80},
    "tags": {"trace_id": "t-1"}}"#;
  let event: Event = serde_json::from_str(line).unwrap();
  assert_eq!(event.severity, Severity::Warn);
  assert_eq!(event.valid_time(), Some(t0()));

  let index = Engine::with_defaults().index(&[event]);
  assert_eq!(index.get_by_correlation_id("t-1"), &[7]);
}

#[test]
fn analysis_is_deterministic() {
  let engine = Engine::with_defaults();
  let events = incident();
  let a = serde_json::to_string(&engine.analyze(&events)).unwrap();
  let b = serde_json::to_string(&engine.analyze(&events)).unwrap();
  assert_eq!(a, b);
}

#[test]
fn invalid_json_config_reports_field() {
  let err = Config::from_json(r#"{"stats": {"bucket_secs": 0}}"#).unwrap_err();
  match err {
    EngineError::InvalidConfig { field, .. } => assert_eq!(field, "stats.bucket_secs"),
    other => panic!("unexpected error: {other}"),
  }
  assert!(matches!(
    Config::from_json("{not json"),
    Err(EngineError::Json(_))
  ));
}

#[test]
fn builtins_ignore_absent_context() {
  let config = Config::default();
  let rules: Vec<Box<dyn Rule>> = vec![
    Box::new(CrashLoopRule),
    Box::new(ErrorBurstAfterChangeRule::new(config.rules.clone())),
    Box::new(RetryToTimeoutRule::new(config.rules.clone())),
  ];
  let events = incident();
  let partial = RuleContext::default().with_events(&events);
  for rule in &rules {
    assert!(rule.evaluate(&RuleContext::default()).is_empty(), "{}", rule.id());
  }
  // Rules needing anomalies stay quiet with events alone.
  assert!(rules[0].evaluate(&partial).is_empty());
  assert!(rules[1].evaluate(&partial).is_empty());
}
