//! Normalize log messages into stable "shapes" for frequency counting.
//!
//! Variable parts are replaced with placeholders, in this order:
//! UUIDs -> `<UUID>`, hex literals -> `<HEX>`, numbers -> `<NUM>`,
//! double-quoted strings -> `<STR>`.

use once_cell::sync::Lazy;
use regex::Regex;

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
    .expect("invalid regex")
});

static HEX_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"0x[0-9a-fA-F]+").expect("invalid regex"));

/// Signed integers and decimals.
static NUM_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"-?\d+\.?\d*").expect("invalid regex"));

static QUOTED_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r#""[^"]+""#).expect("invalid regex"));

/// Replace variable tokens in a message with placeholders.
pub fn message_pattern(message: &str) -> String {
  let s = UUID_REGEX.replace_all(message, "<UUID>");
  let s = HEX_REGEX.replace_all(&s, "<HEX>");
  let s = NUM_REGEX.replace_all(&s, "<NUM>");
  QUOTED_REGEX.replace_all(&s, "<STR>").into_owned()
}
