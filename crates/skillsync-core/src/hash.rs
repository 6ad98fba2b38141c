use crate::error::Result;
use sha2::{Digest, Sha256};
use std::path::Path;
use walkdir::WalkDir;

// ---------------------------------------------------------------------------
// Content hashing
// ---------------------------------------------------------------------------

/// SHA-256 of a file's raw bytes, hex encoded.
pub fn file_hash(path: &Path) -> Result<String> {
    let content = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(hex(hasher.finalize().as_slice()))
}

/// Combined SHA-256 of every regular file under `path`, visited in
/// lexicographic recursive order. Determinism is the invariant here: two
/// identical trees must hash identically regardless of filesystem iteration
/// order. A file argument degrades to `file_hash`.
///
/// Used only for drift detection between a source tree and the hash recorded
/// at install time, never for integrity verification.
pub fn tree_hash(path: &Path) -> Result<String> {
    if path.is_file() {
        return file_hash(path);
    }

    let mut hasher = Sha256::new();
    for entry in WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_file() {
            hasher.update(std::fs::read(entry.path())?);
        }
    }
    Ok(hex(hasher.finalize().as_slice()))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
