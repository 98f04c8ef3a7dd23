//! Helpers for sanitizing data before it enters tracing span attributes
//! or audit event details.
//!
//! Spans and audit trails are shared for debugging and compliance review;
//! these functions keep full storage paths and blob keys out of them.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Returns only the final segment of a blob key.
///
/// `"pods/2026/08/ab34…/scan.jpg"` → `"scan.jpg"`.
pub fn redact_blob_key(key: &str) -> String {
    key.rsplit('/').next().unwrap_or("<unknown>").to_string()
}

/// Returns a short deterministic hash of a key for correlation without
/// exposing the actual value.
pub fn hash_key(key: &str) -> String {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
