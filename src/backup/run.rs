//! Snapshot run coordinator
//!
//! One run: fingerprint the schema, extract every table, write the snapshot
//! and manifest, rotate old backup directories, and summarize. The data
//! source session is owned by the run and released on every exit path.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::builder::{safe_timestamp, SnapshotBuilder};
use super::drift::{detect_drift, latest_manifest, DriftStatus};
use super::fingerprint::SchemaFingerprint;
use super::lock::RunLock;
use super::retention::RetentionManager;
use super::writer::SnapshotWriter;
use crate::config::{DirectoryLayout, ManifestNaming, RetentionPolicy, SnapPaths, Settings};
use crate::error::SnapResult;
use crate::source::{DataSource, TableId, TableSpec};

/// Everything a run needs to know, resolved from settings and flags
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub database: String,
    pub format_version: String,
    pub tables: Vec<TableSpec>,
    pub schema_path: PathBuf,
    pub backups_root: PathBuf,
    pub layout: DirectoryLayout,
    pub manifest: ManifestNaming,
    pub retention: RetentionPolicy,
    pub lock: bool,
    /// Age at which an existing lock is treated as abandoned
    pub lock_stale_after: chrono::Duration,
}

impl RunPlan {
    pub fn from_settings(settings: &Settings, paths: &SnapPaths) -> Self {
        Self {
            database: settings.database_name.clone(),
            format_version: settings.format_version.clone(),
            tables: settings.tables.clone(),
            schema_path: settings.schema_path(paths),
            backups_root: settings.backups_dir(paths),
            layout: settings.layout,
            manifest: settings.manifest,
            retention: settings.retention.clone(),
            lock: settings.lock,
            lock_stale_after: chrono::Duration::minutes(i64::from(settings.lock_stale_minutes)),
        }
    }

    /// Name of the backup directory for a run started at `started_at`
    pub fn directory_name(&self, started_at: &DateTime<Utc>) -> String {
        match self.layout {
            DirectoryLayout::Daily => started_at.format("%Y-%m-%d").to_string(),
            DirectoryLayout::PerRun => safe_timestamp(started_at),
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub database: String,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub snapshot_path: PathBuf,
    pub manifest_path: PathBuf,
    pub size_bytes: u64,
    pub size: String,
    pub schema_fingerprint: SchemaFingerprint,
    pub drift: DriftStatus,
    pub record_counts: BTreeMap<TableId, usize>,
    pub total_records: usize,
    pub failed_tables: Vec<TableId>,
    pub deleted_dirs: Vec<String>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Backup Complete: {}", self.database)?;
        writeln!(f, "================")?;
        writeln!(f, "Run:       {}", self.run_id)?;
        writeln!(f, "Started:   {}", self.started_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f, "Duration:  {:.2}s", self.duration.as_secs_f64())?;
        writeln!(f, "Snapshot:  {}", self.snapshot_path.display())?;
        writeln!(f, "Size:      {}", self.size)?;
        writeln!(f, "Schema:    {} ({})", self.schema_fingerprint, self.drift)?;
        writeln!(f)?;
        writeln!(f, "Records: {}", self.total_records)?;
        for (table, count) in &self.record_counts {
            let marker = if self.failed_tables.contains(table) { "  FAILED" } else { "" };
            writeln!(f, "  {:<16} {:>8}{}", table.as_str(), count, marker)?;
        }
        writeln!(f)?;
        if self.deleted_dirs.is_empty() {
            write!(f, "Old backups removed: none")
        } else {
            write!(f, "Old backups removed: {}", self.deleted_dirs.join(", "))
        }
    }
}

/// A single snapshot run over an owned data source session
pub struct SnapshotRun<S: DataSource> {
    source: S,
    plan: RunPlan,
}

impl<S: DataSource> SnapshotRun<S> {
    pub fn new(source: S, plan: RunPlan) -> Self {
        Self { source, plan }
    }

    /// Run to completion, disconnecting the source whatever the outcome
    pub fn execute(mut self) -> SnapResult<RunSummary> {
        let result = self.run();

        if let Err(e) = self.source.disconnect() {
            warn!(source = self.source.name(), error = %e, "Failed to disconnect data source");
        }

        result
    }

    fn run(&self) -> SnapResult<RunSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        let plan = &self.plan;

        info!(
            run = %run_id,
            database = %plan.database,
            source = self.source.name(),
            "Starting snapshot run"
        );

        let _lock = if plan.lock {
            Some(RunLock::acquire(
                &plan.backups_root,
                run_id,
                plan.lock_stale_after,
            )?)
        } else {
            None
        };

        let fingerprint = SchemaFingerprint::from_file(&plan.schema_path);

        let baseline = latest_manifest(&plan.backups_root).unwrap_or_else(|e| {
            warn!(error = %e, "Could not read previous manifests, skipping drift check");
            None
        });
        let drift = detect_drift(&fingerprint, baseline.as_ref());
        if drift.is_changed() {
            warn!(current = %fingerprint, drift = %drift, "Schema changed since last snapshot");
        }

        let document = SnapshotBuilder::new(plan.database.clone())
            .with_version(plan.format_version.clone())
            .build_at(&plan.tables, &self.source, fingerprint.clone(), started_at);

        let dir_name = plan.directory_name(&started_at);
        let target_dir = plan.backups_root.join(&dir_name);
        let written = SnapshotWriter::new(plan.manifest).write(&document, &target_dir)?;

        let deleted_dirs = if plan.retention.enabled {
            RetentionManager::new(&plan.backups_root)
                .rotate_protecting(plan.retention.keep as usize, &dir_name)
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Retention failed, old backups were kept");
                    Vec::new()
                })
        } else {
            Vec::new()
        };

        let metadata = document.metadata;
        let summary = RunSummary {
            run_id,
            database: metadata.database,
            started_at,
            duration: clock.elapsed(),
            snapshot_path: written.file_path,
            manifest_path: written.manifest_path,
            size_bytes: written.size_bytes,
            size: written.size,
            schema_fingerprint: fingerprint,
            drift,
            record_counts: metadata.record_counts,
            total_records: metadata.total_records,
            failed_tables: metadata.failed_tables,
            deleted_dirs,
        };

        info!(
            run = %run_id,
            records = summary.total_records,
            failed = summary.failed_tables.len(),
            "Snapshot run finished"
        );

        Ok(summary)
    }
}
