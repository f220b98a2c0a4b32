//! Stable fingerprints for normalized message patterns.

use crate::types::Fingerprint;

/// Compute a stable fingerprint from a normalized pattern.
///
/// Uses blake3 for a fast, deterministic hash; identical patterns from
/// different runs get identical fingerprints.
pub fn compute(pattern: &str) -> Fingerprint {
  let mut hasher = blake3::Hasher::new();
  hasher.update(b"pattern|");
  hasher.update(pattern.as_bytes());

  let hash = hasher.finalize();
  // First 16 bytes (32 hex chars).
  let hex = hash.to_hex();
  Fingerprint(hex[..32].to_string())
}
