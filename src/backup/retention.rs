//! Rolling retention over dated backup directories
//!
//! Backup directory names are ISO dates or filesystem-safe ISO timestamps,
//! so plain lexicographic order is chronological order. Retention keeps the
//! newest N directories and removes the rest, whole directory at a time.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::writer::is_snapshot_file;
use crate::error::{SnapError, SnapResult};

/// Summary of one backup directory
#[derive(Debug, Clone, PartialEq)]
pub struct BackupDirInfo {
    pub name: String,
    pub path: PathBuf,
    /// Number of snapshot files inside
    pub snapshot_count: usize,
    /// Total size of the files inside
    pub size_bytes: u64,
}

/// Lists and rotates the backup directories under one root
pub struct RetentionManager {
    root: PathBuf,
}

impl RetentionManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Immediate subdirectories of the root, newest (lexicographically greatest) first
    ///
    /// A missing root yields an empty list.
    fn backup_dirs(&self) -> SnapResult<Vec<(String, PathBuf)>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.root).map_err(|e| {
            SnapError::Io(format!(
                "Failed to read backup directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let mut dirs = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| SnapError::Io(format!("Failed to read directory entry: {}", e)))?;

            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                dirs.push((entry.file_name().to_string_lossy().to_string(), entry.path()));
            }
        }

        dirs.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(dirs)
    }

    /// Backup directories newest first, with their contents summarized
    pub fn list(&self) -> SnapResult<Vec<BackupDirInfo>> {
        self.backup_dirs()?
            .into_iter()
            .map(|(name, path)| {
                let (snapshot_count, size_bytes) = summarize_dir(&path)?;
                Ok(BackupDirInfo {
                    name,
                    path,
                    snapshot_count,
                    size_bytes,
                })
            })
            .collect()
    }

    /// Names of the directories `rotate(keep)` would delete
    pub fn plan(&self, keep: usize) -> SnapResult<Vec<String>> {
        Ok(self
            .doomed(keep, None)?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    /// Delete every backup directory beyond the newest `keep`
    ///
    /// Returns the names that were removed. A directory that cannot be
    /// removed is logged and skipped; the others are still attempted.
    pub fn rotate(&self, keep: usize) -> SnapResult<Vec<String>> {
        self.remove_each(self.doomed(keep, None)?, |path| fs::remove_dir_all(path))
    }

    /// Like `rotate`, but `current` is never deleted and always counts as
    /// one of the `keep` survivors, wherever its name sorts
    pub fn rotate_protecting(&self, keep: usize, current: &str) -> SnapResult<Vec<String>> {
        self.remove_each(self.doomed(keep, Some(current))?, |path| {
            fs::remove_dir_all(path)
        })
    }

    /// Directories past the newest `keep`, oldest last
    fn doomed(&self, keep: usize, protect: Option<&str>) -> SnapResult<Vec<(String, PathBuf)>> {
        let mut dirs = self.backup_dirs()?;

        let slots = match protect {
            Some(current) => match dirs.iter().position(|(name, _)| name == current) {
                Some(index) => {
                    dirs.remove(index);
                    keep.saturating_sub(1)
                }
                None => keep,
            },
            None => keep,
        };

        Ok(dirs.into_iter().skip(slots).collect())
    }

    fn remove_each<F>(&self, doomed: Vec<(String, PathBuf)>, mut remove: F) -> SnapResult<Vec<String>>
    where
        F: FnMut(&Path) -> io::Result<()>,
    {
        let mut deleted = Vec::new();

        for (name, path) in doomed {
            match remove(&path) {
                Ok(()) => {
                    info!(directory = %name, "Removed old backup");
                    deleted.push(name);
                }
                Err(e) => {
                    warn!(
                        directory = %name,
                        error = %e,
                        "Failed to remove old backup, skipping"
                    );
                }
            }
        }

        Ok(deleted)
    }
}

fn summarize_dir(path: &Path) -> SnapResult<(usize, u64)> {
    let mut snapshots = 0;
    let mut size = 0;

    for entry in fs::read_dir(path)
        .map_err(|e| SnapError::Io(format!("Failed to read {}: {}", path.display(), e)))?
    {
        let entry = entry.map_err(|e| SnapError::Io(format!("Failed to read directory entry: {}", e)))?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        size += metadata.len();
        if is_snapshot_file(&entry.file_name().to_string_lossy()) {
            snapshots += 1;
        }
    }

    Ok((snapshots, size))
}
