//! Helpers for keeping host credentials and full media paths out of
//! tracing span attributes.

use std::path::Path;

use sha2::{Digest, Sha256};

/// File name only, never the directory it lives in.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Masks the user part of an rsync/ssh destination.
///
/// - `ubuntu@dtec-flex.com.br:/mnt/x` → `****@dtec-flex.com.br:/mnt/x`
/// - `/mnt/x` → `/mnt/x`
pub fn redact_remote(target: &str) -> String {
    match target.find('@') {
        Some(at) if !target[..at].contains('/') => format!("****@{}", &target[at + 1..]),
        _ => target.to_string(),
    }
}

/// Short stable digest of a path, for correlating log lines without
/// printing the path.
pub fn hash_path(path: &Path) -> String {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    digest.iter().take(8).map(|b| format!("{:02x}", b)).collect()
}
