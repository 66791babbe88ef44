//! Integrity hashing for accepted protocol text.

use sha2::{Digest, Sha256};

/// Computes the integrity hash of a protocol revision.
///
/// The hash is a SHA-256 digest of the exact raw bytes, rendered as lowercase
/// hex. Unlike a semantic fingerprint it is sensitive to every byte, including
/// whitespace and comments, so it identifies precisely the text that was
/// accepted into the audit trail.
pub fn integrity_hash(raw_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Short form used in log lines.
pub fn short_hash(hash: &str) -> &str {
    &hash[..12.min(hash.len())]
}
