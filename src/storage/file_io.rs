//! File I/O utilities with atomic writes
//!
//! Snapshot and manifest files are written to a temp file, synced, and then
//! renamed into place, so a crash never leaves a truncated snapshot behind
//! under its final name.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::SnapError;

/// Read JSON from a file, returning an error if file doesn't exist
pub fn read_json_required<T, P>(path: P) -> Result<T, SnapError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Err(SnapError::Storage(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let file = File::open(path)
        .map_err(|e| SnapError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;

    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .map_err(|e| SnapError::Storage(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Temp path used while `path` is being written
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write pretty-printed JSON to a file atomically (write to temp, then rename)
///
/// Creates missing parent directories. Returns the size of the final file
/// in bytes.
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<u64, SnapError>
where
    T: Serialize + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            SnapError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    // Same directory as the target so the rename stays on one filesystem
    let temp_path = temp_path_for(path);

    let file = File::create(&temp_path).map_err(|e| {
        SnapError::Storage(format!(
            "Failed to create temp file {}: {}",
            temp_path.display(),
            e
        ))
    })?;

    if let Err(e) = write_synced(file, data) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        SnapError::Storage(format!("Failed to rename temp file: {}", e))
    })?;

    let size = fs::metadata(path)
        .map_err(|e| SnapError::Storage(format!("Failed to stat {}: {}", path.display(), e)))?
        .len();

    Ok(size)
}

fn write_synced<T: Serialize + ?Sized>(file: File, data: &T) -> Result<(), SnapError> {
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|e| SnapError::Storage(format!("Failed to serialize data: {}", e)))?;

    writer
        .flush()
        .map_err(|e| SnapError::Storage(format!("Failed to flush data: {}", e)))?;

    // Sync to disk before rename
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| SnapError::Storage(format!("Failed to sync data: {}", e)))
}
