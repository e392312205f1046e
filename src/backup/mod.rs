//! Snapshot pipeline for snapvault
//!
//! Produces point-in-time snapshots of a database, tracks schema drift
//! between them, and rotates old snapshots out.
//!
//! # Architecture
//!
//! - `SchemaFingerprint`: stable hash of the schema definition text
//! - `TableExtractor`: fetches one table, turning failures into empty results
//! - `SnapshotBuilder`: extracts the whole table plan in order
//! - `SnapshotWriter`: writes the snapshot and its manifest
//! - `RetentionManager`: keeps the newest N backup directories
//! - `SnapshotRun`: wires the above together for one run
//!
//! # Layout
//!
//! ```text
//! backups/
//!   2026-10-17/
//!     backup_2026-10-17T02-00-00-412Z.json
//!     summary.json
//!   2026-10-18/
//!     backup_2026-10-18T02-00-00-087Z.json
//!     summary.json
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use snapvault::backup::{RunPlan, SnapshotRun};
//! use snapvault::config::{SnapPaths, Settings};
//! use snapvault::source::JsonDirSource;
//!
//! let paths = SnapPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let source = JsonDirSource::connect(settings.data_dir(&paths))?;
//!
//! let summary = SnapshotRun::new(source, RunPlan::from_settings(&settings, &paths)).execute()?;
//! println!("{}", summary);
//! ```

pub mod builder;
pub mod drift;
pub mod extractor;
pub mod fingerprint;
pub mod lock;
pub mod retention;
pub mod run;
pub mod writer;

pub use builder::{SnapshotBuilder, SnapshotDocument, SnapshotMetadata};
pub use drift::DriftStatus;
pub use extractor::{TableExtractor, TableResult};
pub use fingerprint::SchemaFingerprint;
pub use lock::{LockHolder, RunLock};
pub use retention::{BackupDirInfo, RetentionManager};
pub use run::{RunPlan, RunSummary, SnapshotRun};
pub use writer::{format_size, SnapshotManifest, SnapshotWriter, WriteResult};
