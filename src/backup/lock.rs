//! Run-level lock file
//!
//! Two runs against the same backups root would race during retention.
//! A run holds `<root>/.snapvault.lock` for its whole duration; the file is
//! created exclusively and removed when the guard is dropped.
//!
//! A run that is killed never drops its guard. A lock older than the stale
//! threshold is therefore taken over with a warning instead of blocking
//! every later run.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{SnapError, SnapResult};

/// Lock file name inside the backups root
pub const LOCK_FILE: &str = ".snapvault.lock";

/// Age after which a leftover lock is considered abandoned
pub const DEFAULT_STALE_MINUTES: u32 = 360;

/// Contents of the lock file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockHolder {
    pub run_id: Uuid,
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
}

/// Guard holding the backups-root lock
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Take the lock for `run_id`, creating `root` if needed
    ///
    /// An existing lock at least `stale_after` old is removed and replaced.
    /// A zero `stale_after` breaks any existing lock.
    ///
    /// # Errors
    ///
    /// `SnapError::Locked` if another run holds a fresh lock.
    pub fn acquire(root: &Path, run_id: Uuid, stale_after: Duration) -> SnapResult<Self> {
        fs::create_dir_all(root).map_err(|e| {
            SnapError::Storage(format!(
                "Failed to create backup directory {}: {}",
                root.display(),
                e
            ))
        })?;

        let path = root.join(LOCK_FILE);
        match Self::create(&path, run_id) {
            Err(SnapError::Locked(holder)) => {
                let age = lock_age(&path);
                if !age.map_or(false, |age| age >= stale_after) {
                    return Err(SnapError::Locked(holder));
                }

                warn!(
                    path = %path.display(),
                    holder = %holder,
                    "Breaking stale run lock"
                );
                fs::remove_file(&path).map_err(|e| {
                    SnapError::Storage(format!(
                        "Failed to remove stale lock {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Self::create(&path, run_id)
            }
            other => other,
        }
    }

    fn create(path: &Path, run_id: Uuid) -> SnapResult<Self> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(path).unwrap_or_default();
                return Err(SnapError::Locked(format!(
                    "{} is held by {}",
                    path.display(),
                    holder.trim()
                )));
            }
            Err(e) => {
                return Err(SnapError::Storage(format!(
                    "Failed to create lock file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let holder = LockHolder {
            run_id,
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        // Holder info is advisory; the lock is the file's existence
        if let Ok(json) = serde_json::to_string(&holder) {
            let _ = writeln!(file, "{}", json);
        }
        debug!(path = %path.display(), "Acquired run lock");

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to release run lock");
        }
    }
}

/// How long ago the lock at `path` was taken
///
/// Falls back to the file's modification time when the holder record is
/// unreadable. `None` if neither is available.
fn lock_age(path: &Path) -> Option<Duration> {
    let acquired_at = fs::read_to_string(path)
        .ok()
        .and_then(|text| serde_json::from_str::<LockHolder>(text.trim()).ok())
        .map(|holder| holder.acquired_at)
        .or_else(|| {
            fs::metadata(path)
                .and_then(|m| m.modified())
                .ok()
                .map(DateTime::<Utc>::from)
        })?;

    Some(Utc::now() - acquired_at)
}
