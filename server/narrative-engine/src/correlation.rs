//! Correlation ids: which tags relate otherwise-separate events.
//!
//! The extraction layer normalizes request/trace id variants into these tag
//! keys before events reach us; here we only read them.

use crate::types::Event;

pub const REQUEST_ID: &str = "request_id";
pub const TRACE_ID: &str = "trace_id";
pub const UUID: &str = "uuid";

/// Keys the event index files events under.
pub const INDEX_KEYS: [&str; 3] = [REQUEST_ID, TRACE_ID, UUID];

/// Keys that bind events into one episode; `uuid` is index-only.
pub const EPISODE_KEYS: [&str; 2] = [REQUEST_ID, TRACE_ID];

/// Non-empty tag values of `event` under `keys`, in key order.
pub fn ids<'a>(event: &'a Event, keys: &'a [&'a str]) -> impl Iterator<Item = &'a str> + 'a {
  keys
    .iter()
    .filter_map(move |k| event.tags.get(*k))
    .map(String::as_str)
    .filter(|v| !v.is_empty())
}
