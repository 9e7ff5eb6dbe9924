// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence kit: atomic JSON writes, `.bak` fallback reads, and
//! filesystem advisory locks.
//!
//! Writes to the same path never interleave: a process-wide registry
//! hands out one mutex per path and the whole tmp → `.bak` → rename
//! sequence runs under it. The backup is taken from the *current* file
//! immediately before the rename, so `.bak` is never stale.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::warn;

/// Retry interval while waiting on an advisory lock.
const LOCK_RETRY: Duration = Duration::from_millis(30);

/// Default advisory lock timeout.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(3000);

/// Errors from persistence kit operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("write failed for {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("lock timeout on {path}")]
    LockTimeout { path: PathBuf },
    #[error("missing user context: {0}")]
    MissingUserContext(String),
    #[error("cross-user access rejected: record owned by {owner}, caller {caller}")]
    CrossUser { owner: String, caller: String },
}

impl StoreError {
    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Io(_) | StoreError::Json(_) => "FS_READ_FAILED",
            StoreError::WriteFailed { .. } => "FS_WRITE_FAILED",
            StoreError::LockTimeout { .. } => "LockTimeout",
            StoreError::MissingUserContext(_) => "MissingUserContext",
            StoreError::CrossUser { .. } => "invalid_user",
        }
    }
}

/// One mutex per path so same-path writes serialize across the process.
static WRITE_LOCKS: LazyLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn path_lock(path: &Path) -> Arc<Mutex<()>> {
    let mut registry = WRITE_LOCKS.lock();
    registry
        .entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

fn bak_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".bak");
    PathBuf::from(os)
}

/// Atomically replace `path` with the JSON form of `payload`.
///
/// Sequence: write `<path>.<pid>.<rand>.tmp`, best-effort copy the current
/// file to `<path>.bak`, rename the tmp over the target. A crash at any
/// point leaves either the old contents, or the old contents plus a tmp
/// file, or the new contents, never a half-rendered target.
pub fn atomic_write_json<T: Serialize>(path: &Path, payload: &T) -> Result<(), StoreError> {
    let lock = path_lock(path);
    let _guard = lock.lock();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(
        ".{}.{}.tmp",
        std::process::id(),
        uuid::Uuid::new_v4().simple()
    ));
    let tmp = PathBuf::from(tmp);

    let bytes = serde_json::to_vec_pretty(payload)?;
    std::fs::write(&tmp, &bytes).map_err(|source| StoreError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;

    // Back up the current file before the rename so .bak is never stale.
    if path.exists() {
        let _ = std::fs::copy(path, bak_path(path));
    }

    std::fs::rename(&tmp, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp);
        StoreError::WriteFailed {
            path: path.to_path_buf(),
            source,
        }
    })?;

    Ok(())
}

/// Atomically replace `path` with raw text (JSONL transcripts).
///
/// Same tmp → `.bak` → rename sequence as [`atomic_write_json`], under
/// the same per-path serialization.
pub fn atomic_write_text(path: &Path, contents: &str) -> Result<(), StoreError> {
    let lock = path_lock(path);
    let _guard = lock.lock();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(
        ".{}.{}.tmp",
        std::process::id(),
        uuid::Uuid::new_v4().simple()
    ));
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, contents).map_err(|source| StoreError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;

    if path.exists() {
        let _ = std::fs::copy(path, bak_path(path));
    }

    std::fs::rename(&tmp, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp);
        StoreError::WriteFailed {
            path: path.to_path_buf(),
            source,
        }
    })?;

    Ok(())
}

/// Read and parse `path`, falling back to `<path>.bak` once.
///
/// Returns `Ok(None)` when neither the primary nor the backup yields a
/// parseable document; callers treat that as an empty store.
pub fn read_json_or_bak<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match try_read(path) {
        Ok(Some(value)) => return Ok(Some(value)),
        Ok(None) => {}
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "primary store file unreadable, trying .bak",
            );
        }
    }

    let bak = bak_path(path);
    match try_read(&bak) {
        Ok(found) => Ok(found),
        Err(e) => {
            warn!(bak = %bak.display(), error = %e, "backup store file unreadable");
            Ok(None)
        }
    }
}

fn try_read<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Advisory filesystem lock for cross-process critical sections.
///
/// Acquire creates the lock file exclusively; contenders retry every
/// 30 ms until the deadline. Dropping the guard deletes the file,
/// ignoring errors.
#[derive(Debug)]
pub struct FsLock {
    path: PathBuf,
}

impl FsLock {
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let deadline = Instant::now() + timeout;
        loop {
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
            {
                Ok(_) => {
                    return Ok(Self {
                        path: path.to_path_buf(),
                    })
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Err(StoreError::LockTimeout {
                            path: path.to_path_buf(),
                        });
                    }
                    std::thread::sleep(LOCK_RETRY);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for FsLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
#[path = "kit_tests.rs"]
mod tests;
