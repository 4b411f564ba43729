//! Shared scoped-temp-file write helper (§9 "Scoped resources"): every file
//! write in the pipeline goes through a temp path with guaranteed
//! rename-or-discard, so a crash never leaves a half-written output.

use crate::error::FeedError;
use std::path::Path;

/// Write `contents` to `path` via a sibling temp file, then rename into place.
pub fn write_atomic_bytes(path: &Path, contents: &[u8]) -> Result<(), FeedError> {
    let dir = path.parent().expect("output paths always have a parent dir");
    std::fs::create_dir_all(dir).map_err(|source| FeedError::WriteFailed {
        path: path.display().to_string(),
        source,
    })?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|source| FeedError::WriteFailed {
        path: path.display().to_string(),
        source,
    })?;
    std::io::Write::write_all(&mut tmp, contents).map_err(|source| FeedError::WriteFailed {
        path: path.display().to_string(),
        source,
    })?;
    tmp.persist(path).map_err(|e| FeedError::WriteFailed {
        path: path.display().to_string(),
        source: e.error,
    })?;
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically to `path`.
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), FeedError> {
    let json = serde_json::to_vec_pretty(value)?;
    write_atomic_bytes(path, &json)
}
