//! Narrative engine: turns an ordered sequence of parsed log events into
//! aggregate statistics, episodes, anomalies and rule-driven findings.
//!
//! Pure batch computation. No I/O, no shared state between calls; ingestion
//! and rendering belong to the caller.

pub mod anomaly;
pub mod config;
pub mod correlation;
pub mod engine;
pub mod episode;
pub mod error;
pub mod fingerprint;
pub mod index;
pub mod normalize;
pub mod rules;
pub mod stats;
pub mod types;

pub use config::Config;
pub use engine::{Analysis, Engine};
pub use error::EngineError;
pub use index::EventIndex;
pub use rules::{Rule, RuleContext, RuleRegistry};
pub use types::{Anomaly, Episode, Event, Finding, Severity, Stats};
