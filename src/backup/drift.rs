//! Schema drift between consecutive snapshots
//!
//! The latest manifest already on disk is the baseline; its fingerprint is
//! compared with the one computed for the current run.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::fingerprint::SchemaFingerprint;
use super::retention::RetentionManager;
use super::writer::{is_manifest_file, SnapshotManifest};
use crate::error::SnapResult;
use crate::storage::read_json_required;

/// How the current schema compares to the previous snapshot's
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DriftStatus {
    /// No earlier snapshot to compare with
    NoBaseline,
    Unchanged,
    Changed { previous: SchemaFingerprint },
    /// One side has the unknown sentinel
    Unknown,
}

impl DriftStatus {
    pub fn is_changed(&self) -> bool {
        matches!(self, DriftStatus::Changed { .. })
    }
}

impl fmt::Display for DriftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriftStatus::NoBaseline => write!(f, "no previous snapshot"),
            DriftStatus::Unchanged => write!(f, "unchanged"),
            DriftStatus::Changed { previous } => write!(f, "changed (was {})", previous),
            DriftStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Compare `current` against the baseline manifest, if any
pub fn detect_drift(current: &SchemaFingerprint, baseline: Option<&SnapshotManifest>) -> DriftStatus {
    let Some(baseline) = baseline else {
        return DriftStatus::NoBaseline;
    };

    let previous = &baseline.metadata.schema_fingerprint;
    if current.is_unknown() || previous.is_unknown() {
        DriftStatus::Unknown
    } else if previous == current {
        DriftStatus::Unchanged
    } else {
        DriftStatus::Changed {
            previous: previous.clone(),
        }
    }
}

/// The most recent readable manifest under `root`
///
/// Directories are searched newest first; within a directory the manifest
/// with the latest metadata timestamp wins. Unreadable manifests are skipped.
pub fn latest_manifest(root: &Path) -> SnapResult<Option<SnapshotManifest>> {
    for dir in RetentionManager::new(root).list()? {
        let mut best: Option<SnapshotManifest> = None;

        for entry in fs::read_dir(&dir.path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !is_manifest_file(&name) {
                continue;
            }

            match read_json_required::<SnapshotManifest, _>(entry.path()) {
                Ok(manifest) => {
                    let newer = best
                        .as_ref()
                        .map_or(true, |b| manifest.metadata.timestamp > b.metadata.timestamp);
                    if newer {
                        best = Some(manifest);
                    }
                }
                Err(e) => debug!(file = %name, error = %e, "Skipping unreadable manifest"),
            }
        }

        if best.is_some() {
            return Ok(best);
        }
    }

    Ok(None)
}
