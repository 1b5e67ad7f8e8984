//! Filesystem staging between pipeline stages.

use std::{io, path::Path};

use anyhow::Context as _;

use crate::foundation::error::{BulbError, BulbResult};

/// Create `dir` and any missing parents.
pub fn ensure_dir(dir: &Path) -> BulbResult<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create directory '{}'", dir.display()))?;
    Ok(())
}

/// Remove every file and subdirectory inside `dir`, keeping `dir` itself.
///
/// A missing `dir` is created. An unreadable `dir` or entries that cannot be removed are
/// logged and returned as [`BulbError::Cleanup`]; they never abort the purge.
pub fn purge_dir(dir: &Path) -> BulbResult<Vec<BulbError>> {
    purge_dir_with(dir, remove_entry)
}

/// Delete one directory entry, recursively for directories.
pub fn remove_entry(path: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

/// [`purge_dir`] with a caller-supplied removal function.
pub fn purge_dir_with<R>(dir: &Path, remove: R) -> BulbResult<Vec<BulbError>>
where
    R: Fn(&Path, bool) -> io::Result<()>,
{
    if !dir.exists() {
        ensure_dir(dir)?;
        return Ok(Vec::new());
    }

    let mut removed = 0usize;
    let mut failures = Vec::new();
    match std::fs::read_dir(dir) {
        Ok(entries) => {
            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        failures.push(cleanup_failure(dir, e));
                        continue;
                    }
                };
                let path = entry.path();
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                match remove(&path, is_dir) {
                    Ok(()) => removed += 1,
                    Err(e) => failures.push(cleanup_failure(&path, e)),
                }
            }
        }
        Err(e) => failures.push(cleanup_failure(dir, e)),
    }

    for failure in &failures {
        tracing::warn!(kind = failure.kind(), "{failure}");
    }
    tracing::info!(removed, failed = failures.len(), "purged '{}'", dir.display());
    Ok(failures)
}

fn cleanup_failure(path: &Path, err: io::Error) -> BulbError {
    BulbError::Cleanup {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
