//! Filesystem helpers shared across modules.
//!
//! These helpers provide consistent error context (operation + path) and
//! reduce duplicated `create_dir_all` / parent-directory checks.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{Error, Result};

/// Convert an IO error into an application error with operation + path context.
pub fn io_error(op: &'static str, path: &Path, source: std::io::Error) -> Error {
    Error::io_path(op, path, source)
}

/// Ensure a directory exists, creating it (recursively) if needed.
pub async fn ensure_dir_all_with_op(op: &'static str, path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| io_error(op, path, e))
}

/// Ensure a directory exists, creating it (recursively) if needed.
pub async fn ensure_dir_all(path: &Path) -> Result<()> {
    ensure_dir_all_with_op("creating directory", path).await
}

/// Ensure the parent directory of a file path exists.
pub async fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    ensure_dir_all(parent).await
}

/// Ensure a directory exists (synchronous variant).
pub fn ensure_dir_all_sync(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| io_error("creating directory", path, e))
}

/// Check that `dir` exists (or can be created) and accepts new entries.
///
/// Probes by creating and removing a scratch directory inside it.
pub fn is_writable_dir(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    tempfile::Builder::new()
        .prefix(".writetest")
        .tempdir_in(dir)
        .map(|probe| probe.close().is_ok())
        .unwrap_or(false)
}

/// Pick the first writable directory from `candidates`.
///
/// Falls back to the platform temp directory when none of them is writable.
pub fn first_writable_dir<I>(candidates: I) -> PathBuf
where
    I: IntoIterator<Item = PathBuf>,
{
    for candidate in candidates {
        if is_writable_dir(&candidate) {
            return candidate;
        }
        debug!(dir = %candidate.display(), "Directory not writable, trying next candidate");
    }
    std::env::temp_dir()
}
