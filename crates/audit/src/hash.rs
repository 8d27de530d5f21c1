//! Content hashing for the per-execution audit chain.
//!
//! Each entry's `hash` commits to `(previous_hash, timestamp, event,
//! sanitized_data)`; the next entry's `previous_hash` is this value, so the
//! stored order can be verified as tamper-evident (spec.md §8, Testable
//! Property 3).

use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hash used to seed the first entry of a fresh execution's chain.
pub const GENESIS_HASH: &str = "0";

pub fn chain_hash(
    previous_hash: &str,
    timestamp: DateTime<Utc>,
    event: &str,
    sanitized_data: Option<&Value>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous_hash.as_bytes());
    hasher.update(timestamp.to_rfc3339().as_bytes());
    hasher.update(event.as_bytes());
    if let Some(data) = sanitized_data {
        hasher.update(data.to_string().as_bytes());
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        use std::fmt::Write as _;
        let _ = std::write!(&mut out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_identical_inputs() {
        let ts = Utc::now();
        let a = chain_hash("abc", ts, "node_started", None);
        let b = chain_hash("abc", ts, "node_started", None);
        assert_eq!(a, b);
    }

    #[test]
    fn differs_when_previous_hash_changes() {
        let ts = Utc::now();
        let a = chain_hash("abc", ts, "node_started", None);
        let b = chain_hash("xyz", ts, "node_started", None);
        assert_ne!(a, b);
    }
}
