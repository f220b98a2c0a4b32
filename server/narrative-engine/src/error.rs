//! Structured error types for the narrative engine.
//!
//! Analysis never fails; these only surface while configuring the engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("config: {field}: {reason}")]
  InvalidConfig { field: String, reason: String },

  #[error("rule already registered: {0}")]
  DuplicateRule(String),

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl EngineError {
  pub fn invalid_config(field: &str, reason: &str) -> Self {
    Self::InvalidConfig {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }
}
