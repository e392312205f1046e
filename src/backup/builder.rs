//! Snapshot assembly
//!
//! Runs the extractor over the backup plan strictly in order, one table at a
//! time, and folds the results into a `SnapshotDocument`. The plan decides
//! extraction order only. `record_counts` and `data` are keyed by `TableId`,
//! so the written document always lists tables parents-first in declaration
//! order, however the plan is arranged. Nothing gives cross-table
//! consistency, since each table is read at its own instant.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::extractor::{TableExtractor, TableResult};
use super::fingerprint::SchemaFingerprint;
use crate::source::{DataSource, Row, TableId, TableSpec};

/// Snapshot format version written into every document
pub const SNAPSHOT_FORMAT_VERSION: &str = "1.0";

/// Descriptive header of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// When extraction started
    pub timestamp: DateTime<Utc>,
    /// Snapshot format version
    pub version: String,
    /// Logical name of the database
    pub database: String,
    pub schema_fingerprint: SchemaFingerprint,
    /// Rows captured per table; failed tables count as 0
    pub record_counts: BTreeMap<TableId, usize>,
    pub total_records: usize,
    /// Tables whose extraction failed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_tables: Vec<TableId>,
}

impl SnapshotMetadata {
    /// Filesystem-safe rendering of the start time
    ///
    /// `2026-10-18T09:30:00.123Z` becomes `2026-10-18T09-30-00-123Z`.
    pub fn safe_timestamp(&self) -> String {
        safe_timestamp(&self.timestamp)
    }

    pub fn is_failed(&self, table: TableId) -> bool {
        self.failed_tables.contains(&table)
    }
}

/// Format `ts` as RFC 3339 with milliseconds, with `:` and `.` replaced by `-`
pub fn safe_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// A complete snapshot: metadata plus the rows of every table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub metadata: SnapshotMetadata,
    pub data: BTreeMap<TableId, Vec<Row>>,
}

impl SnapshotDocument {
    /// Count of rows actually present in `data`
    pub fn row_total(&self) -> usize {
        self.data.values().map(Vec::len).sum()
    }
}

/// Builds snapshot documents for one logical database
pub struct SnapshotBuilder {
    database: String,
    version: String,
}

impl SnapshotBuilder {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            version: SNAPSHOT_FORMAT_VERSION.to_string(),
        }
    }

    /// Override the format version stamped into metadata
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Extract every table in `specs` and assemble the document
    pub fn build<S: DataSource + ?Sized>(
        &self,
        specs: &[TableSpec],
        source: &S,
        fingerprint: SchemaFingerprint,
    ) -> SnapshotDocument {
        self.build_at(specs, source, fingerprint, Utc::now())
    }

    /// Same as `build`, with an explicit extraction start time
    pub fn build_at<S: DataSource + ?Sized>(
        &self,
        specs: &[TableSpec],
        source: &S,
        fingerprint: SchemaFingerprint,
        started_at: DateTime<Utc>,
    ) -> SnapshotDocument {
        let extractor = TableExtractor::new(source);

        info!(
            database = %self.database,
            tables = specs.len(),
            "Extracting tables"
        );

        // Counts are only filled in once every table has been attempted
        let results: Vec<TableResult> = specs.iter().map(|spec| extractor.extract(spec)).collect();

        let mut record_counts = BTreeMap::new();
        let mut failed_tables = Vec::new();
        let mut data = BTreeMap::new();

        for result in results {
            record_counts.insert(result.table, result.row_count());
            if !result.succeeded() {
                failed_tables.push(result.table);
            }
            data.insert(result.table, result.rows);
        }

        let total_records: usize = record_counts.values().sum();

        SnapshotDocument {
            metadata: SnapshotMetadata {
                timestamp: started_at,
                version: self.version.clone(),
                database: self.database.clone(),
                schema_fingerprint: fingerprint,
                record_counts,
                total_records,
                failed_tables,
            },
            data,
        }
    }
}
