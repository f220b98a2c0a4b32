//! Episode segmentation: split the event stream on time gaps, then merge
//! adjacent episodes that share a correlation id.

use std::collections::BTreeSet;
use std::ops::Range;

use tracing::debug;

use crate::config::EpisodeConfig;
use crate::correlation;
use crate::types::{Episode, Event, Severity};

/// Builds episodes from an ordered event sequence.
#[derive(Debug, Clone, Default)]
pub struct EpisodeBuilder {
  config: EpisodeConfig,
}

impl EpisodeBuilder {
  pub fn new(config: EpisodeConfig) -> Self {
    Self { config }
  }

  /// Segment `events` into episodes. Ids start at 1 and are never reused;
  /// a merged episode keeps the id of its earliest part.
  pub fn build(&self, events: &[Event]) -> Vec<Episode> {
    if events.is_empty() {
      return Vec::new();
    }

    let episodes: Vec<Episode> = self
      .segment(events)
      .into_iter()
      .zip(1u64..)
      .map(|(range, id)| finalize(id, &events[range]))
      .collect();

    debug!(events = events.len(), episodes = episodes.len(), "segmented episodes");

    if !self.config.merge_by_correlation {
      return episodes;
    }

    let merged = merge_adjacent(episodes);
    debug!(episodes = merged.len(), "merged episodes by correlation");
    merged
  }

  /// Index ranges of each phase-1 episode. Covers `events` exactly once, in order.
  fn segment(&self, events: &[Event]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for i in 1..events.len() {
      if self.has_time_gap(&events[i - 1], &events[i]) {
        ranges.push(start..i);
        start = i;
      }
    }
    ranges.push(start..events.len());
    ranges
  }

  /// Only split when both sides carry a valid timestamp.
  fn has_time_gap(&self, prev: &Event, next: &Event) -> bool {
    match (prev.valid_time(), next.valid_time()) {
      (Some(a), Some(b)) => b - a > self.config.time_gap(),
      _ => false,
    }
  }
}

fn finalize(id: u64, members: &[Event]) -> Episode {
  let mut correlation_ids = BTreeSet::new();
  for event in members {
    correlation_ids.extend(correlation::ids(event, &correlation::EPISODE_KEYS).map(String::from));
  }

  let times: Vec<_> = members.iter().filter_map(Event::valid_time).collect();

  Episode {
    id,
    event_ids: members.iter().map(|e| e.id).collect(),
    start_time: times.iter().min().copied(),
    end_time: times.iter().max().copied(),
    correlation_ids,
    highlights: highlights(members),
    max_severity: members
      .iter()
      .map(|e| e.severity)
      .max()
      .unwrap_or(Severity::Unknown),
  }
}

/// First ERROR/FATAL member, then the (earliest) max-severity member if it
/// is a different event and above UNKNOWN.
fn highlights(members: &[Event]) -> Vec<u64> {
  let first_error = members.iter().find(|e| e.severity.is_error()).map(|e| e.id);

  let mut max: Option<&Event> = None;
  for event in members {
    if event.severity > max.map_or(Severity::Unknown, |m| m.severity) {
      max = Some(event);
    }
  }

  let mut out: Vec<u64> = first_error.into_iter().collect();
  if let Some(m) = max {
    if Some(m.id) != first_error {
      out.push(m.id);
    }
  }
  out
}

/// Left-to-right fold: each episode joins the running accumulator when their
/// correlation-id sets intersect, otherwise it starts a new accumulator.
fn merge_adjacent(episodes: Vec<Episode>) -> Vec<Episode> {
  episodes.into_iter().fold(Vec::new(), |mut merged, next| {
    match merged.pop() {
      Some(prev) if !prev.correlation_ids.is_disjoint(&next.correlation_ids) => {
        debug!(into = prev.id, from = next.id, "merging episodes");
        merged.push(merge(prev, next));
      }
      Some(prev) => {
        merged.push(prev);
        merged.push(next);
      }
      None => merged.push(next),
    }
    merged
  })
}

fn merge(mut a: Episode, b: Episode) -> Episode {
  a.event_ids.extend(b.event_ids);
  a.correlation_ids.extend(b.correlation_ids);
  a.highlights.extend(b.highlights);
  a.start_time = a.start_time.into_iter().chain(b.start_time).min();
  a.end_time = a.end_time.into_iter().chain(b.end_time).max();
  a.max_severity = a.max_severity.max(b.max_severity);
  a
}
