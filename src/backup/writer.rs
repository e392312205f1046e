//! Snapshot persistence
//!
//! Writes the full snapshot document plus a small manifest next to it so a
//! backup can be inspected without loading the whole dump.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::builder::{SnapshotDocument, SnapshotMetadata};
use crate::config::settings::ManifestNaming;
use crate::error::{SnapError, SnapResult};
use crate::storage::write_json_atomic;

/// Fixed manifest name used by `ManifestNaming::Summary`
pub const SUMMARY_FILE: &str = "summary.json";

/// Prefix of every snapshot file
pub const SNAPSHOT_PREFIX: &str = "backup_";

/// Suffix of per-run manifests
pub const MANIFEST_SUFFIX: &str = ".manifest.json";

/// Companion record written beside each snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    /// File name of the snapshot inside its backup directory
    pub snapshot_file: String,
    pub metadata: SnapshotMetadata,
    pub size_bytes: u64,
    /// Human-readable size, e.g. "1.50 KB"
    pub size: String,
}

/// Where a snapshot ended up and how big it is
#[derive(Debug, Clone, PartialEq)]
pub struct WriteResult {
    pub file_path: PathBuf,
    pub manifest_path: PathBuf,
    pub size_bytes: u64,
    pub size: String,
}

/// Writes snapshot documents into a backup directory
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotWriter {
    manifest: ManifestNaming,
}

impl SnapshotWriter {
    pub fn new(manifest: ManifestNaming) -> Self {
        Self { manifest }
    }

    /// Snapshot file name for a document
    pub fn snapshot_file_name(metadata: &SnapshotMetadata) -> String {
        format!("{}{}.json", SNAPSHOT_PREFIX, metadata.safe_timestamp())
    }

    /// Manifest file name for a document under this writer's naming policy
    pub fn manifest_file_name(&self, metadata: &SnapshotMetadata) -> String {
        match self.manifest {
            ManifestNaming::Summary => SUMMARY_FILE.to_string(),
            ManifestNaming::PerRun => format!(
                "{}{}{}",
                SNAPSHOT_PREFIX,
                metadata.safe_timestamp(),
                MANIFEST_SUFFIX
            ),
        }
    }

    /// Serialize `document` and its manifest into `target_dir`
    ///
    /// # Errors
    ///
    /// Any failure to create the directory or write either file is returned
    /// as `SnapError::Storage`; the caller treats it as fatal.
    pub fn write(&self, document: &SnapshotDocument, target_dir: &Path) -> SnapResult<WriteResult> {
        std::fs::create_dir_all(target_dir).map_err(|e| {
            SnapError::Storage(format!(
                "Failed to create backup directory {}: {}",
                target_dir.display(),
                e
            ))
        })?;

        let snapshot_file = Self::snapshot_file_name(&document.metadata);
        let file_path = target_dir.join(&snapshot_file);

        let size_bytes = write_json_atomic(&file_path, document)?;
        let size = format_size(size_bytes);

        let manifest = SnapshotManifest {
            snapshot_file,
            metadata: document.metadata.clone(),
            size_bytes,
            size: size.clone(),
        };
        let manifest_path = target_dir.join(self.manifest_file_name(&document.metadata));
        write_json_atomic(&manifest_path, &manifest)?;

        info!(
            path = %file_path.display(),
            size = %size,
            "Snapshot written"
        );

        Ok(WriteResult {
            file_path,
            manifest_path,
            size_bytes,
            size,
        })
    }
}

/// True for file names this writer produces as manifests
pub fn is_manifest_file(name: &str) -> bool {
    name == SUMMARY_FILE || (name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(MANIFEST_SUFFIX))
}

/// True for file names this writer produces as snapshots
pub fn is_snapshot_file(name: &str) -> bool {
    name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(".json") && !name.ends_with(MANIFEST_SUFFIX)
}

/// Format a byte count as B/KB/MB/GB with two decimals
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", size, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::builder::SnapshotBuilder;
    use crate::backup::extractor::tests::FakeSource;
    use crate::backup::fingerprint::SchemaFingerprint;
    use crate::source::{TableId, TableSpec};
    use crate::storage::read_json_required;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn sample_document() -> SnapshotDocument {
        let source = FakeSource::default().with_rows(TableId::Users, 3);
        SnapshotBuilder::new("clinic").build_at(
            &[TableSpec::new(TableId::Settings), TableSpec::new(TableId::Users)],
            &source,
            SchemaFingerprint::compute("model User { id Int }"),
            Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap(),
        )
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0.00 B");
        assert_eq!(format_size(512), "512.00 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
        assert_eq!(format_size(2048 * 1024 * 1024 * 1024), "2048.00 GB");
    }

    #[test]
    fn test_write_creates_nested_dir() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("backups").join("2026-10-18");

        let result = SnapshotWriter::default()
            .write(&sample_document(), &target)
            .unwrap();

        assert!(result.file_path.exists());
        assert_eq!(
            result.file_path.file_name().unwrap(),
            "backup_2026-10-18T09-30-00-000Z.json"
        );
        assert_eq!(result.manifest_path, target.join(SUMMARY_FILE));
        assert_eq!(
            result.size_bytes,
            std::fs::metadata(&result.file_path).unwrap().len()
        );
    }

    #[test]
    fn test_written_document_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let doc = sample_document();

        let result = SnapshotWriter::default().write(&doc, temp_dir.path()).unwrap();
        let parsed: SnapshotDocument = read_json_required(&result.file_path).unwrap();

        assert_eq!(parsed, doc);
        assert_eq!(parsed.row_total(), parsed.metadata.total_records);
    }

    #[test]
    fn test_manifest_contents() {
        let temp_dir = TempDir::new().unwrap();
        let doc = sample_document();

        let result = SnapshotWriter::default().write(&doc, temp_dir.path()).unwrap();
        let manifest: SnapshotManifest = read_json_required(&result.manifest_path).unwrap();

        assert_eq!(manifest.snapshot_file, "backup_2026-10-18T09-30-00-000Z.json");
        assert_eq!(manifest.metadata, doc.metadata);
        assert_eq!(manifest.size_bytes, result.size_bytes);
        assert_eq!(manifest.size, result.size);
    }

    #[test]
    fn test_per_run_manifest_name() {
        let temp_dir = TempDir::new().unwrap();
        let writer = SnapshotWriter::new(ManifestNaming::PerRun);

        let result = writer.write(&sample_document(), temp_dir.path()).unwrap();
        assert_eq!(
            result.manifest_path.file_name().unwrap(),
            "backup_2026-10-18T09-30-00-000Z.manifest.json"
        );
        assert!(!temp_dir.path().join(SUMMARY_FILE).exists());
    }

    #[test]
    fn test_only_snapshot_and_manifest_written() {
        let temp_dir = TempDir::new().unwrap();
        SnapshotWriter::default()
            .write(&sample_document(), temp_dir.path())
            .unwrap();

        let names: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().any(|n| is_snapshot_file(n)));
        assert!(names.iter().any(|n| is_manifest_file(n)));
    }

    #[test]
    fn test_unwritable_target_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "file").unwrap();

        let err = SnapshotWriter::default()
            .write(&sample_document(), &blocker.join("2026-10-18"))
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_file_name_classification() {
        assert!(is_snapshot_file("backup_2026-10-18T09-30-00-000Z.json"));
        assert!(!is_snapshot_file("backup_2026-10-18T09-30-00-000Z.manifest.json"));
        assert!(is_manifest_file("summary.json"));
        assert!(is_manifest_file("backup_2026-10-18T09-30-00-000Z.manifest.json"));
        assert!(!is_manifest_file("notes.json"));
    }
}
