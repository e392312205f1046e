//! User settings for snapvault
//!
//! Manages what gets backed up and how: the table plan, directory layout,
//! manifest naming and the retention policy.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::paths::SnapPaths;
use crate::backup::builder::SNAPSHOT_FORMAT_VERSION;
use crate::backup::lock::DEFAULT_STALE_MINUTES;
use crate::error::SnapError;
use crate::source::TableSpec;

/// How backup directories are named
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryLayout {
    /// One directory per calendar day (e.g., "2026-10-18")
    #[default]
    Daily,
    /// One directory per run, named by the filesystem-safe timestamp
    PerRun,
}

/// How the manifest next to each snapshot is named
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ManifestNaming {
    /// A fixed `summary.json`, overwritten by later runs in the same directory
    #[default]
    Summary,
    /// `backup_<timestamp>.manifest.json`, one per snapshot
    PerRun,
}

/// Backup retention settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Whether old backup directories are rotated out at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of most recent backup directories to keep
    #[serde(default = "default_keep")]
    pub keep: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            keep: default_keep(),
        }
    }
}

/// User settings for snapvault
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Logical name of the database recorded in every snapshot
    #[serde(default = "default_database_name")]
    pub database_name: String,

    /// Schema definition file; defaults to `schema.prisma` in the home dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<PathBuf>,

    /// Data directory for the JSON source; defaults to `data/` in the home dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Root of the backup directories; defaults to `backups/` in the home dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backups_dir: Option<PathBuf>,

    /// Tables to back up, in extraction order
    #[serde(default = "TableSpec::default_plan")]
    pub tables: Vec<TableSpec>,

    #[serde(default)]
    pub retention: RetentionPolicy,

    #[serde(default)]
    pub layout: DirectoryLayout,

    #[serde(default)]
    pub manifest: ManifestNaming,

    /// Take a lock file in the backups root for the duration of a run
    #[serde(default = "default_true")]
    pub lock: bool,

    /// Minutes after which a leftover lock from a killed run is broken
    #[serde(default = "default_lock_stale_minutes")]
    pub lock_stale_minutes: u32,

    /// Format version stamped into snapshot metadata
    #[serde(default = "default_format_version")]
    pub format_version: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_database_name() -> String {
    "app".to_string()
}

fn default_keep() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_lock_stale_minutes() -> u32 {
    DEFAULT_STALE_MINUTES
}

fn default_format_version() -> String {
    SNAPSHOT_FORMAT_VERSION.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            database_name: default_database_name(),
            schema_path: None,
            data_dir: None,
            backups_dir: None,
            tables: TableSpec::default_plan(),
            retention: RetentionPolicy::default(),
            layout: DirectoryLayout::default(),
            manifest: ManifestNaming::default(),
            lock: true,
            lock_stale_minutes: default_lock_stale_minutes(),
            format_version: default_format_version(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &SnapPaths) -> Result<Self, SnapError> {
        let settings_path = paths.settings_file();

        let settings = if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| SnapError::Io(format!("Failed to read settings file: {}", e)))?;

            serde_json::from_str::<Settings>(&contents)
                .map_err(|e| SnapError::Config(format!("Failed to parse settings file: {}", e)))?
        } else {
            // Don't save yet - let caller decide when to persist
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self, paths: &SnapPaths) -> Result<(), SnapError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| SnapError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| SnapError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    /// Reject settings a run could not honor
    pub fn validate(&self) -> Result<(), SnapError> {
        if self.database_name.trim().is_empty() {
            return Err(SnapError::Validation("database_name must not be empty".into()));
        }

        if self.retention.enabled && self.retention.keep == 0 {
            return Err(SnapError::Validation(
                "retention.keep must be at least 1 (disable retention instead)".into(),
            ));
        }

        if self.tables.is_empty() {
            return Err(SnapError::Validation("no tables configured".into()));
        }

        let mut seen = HashSet::new();
        for spec in &self.tables {
            if !seen.insert(spec.table) {
                return Err(SnapError::Validation(format!(
                    "table '{}' is listed more than once",
                    spec.table
                )));
            }
            if let Some(name) = spec.include.iter().find(|n| spec.table.relation(n).is_none()) {
                return Err(SnapError::Validation(format!(
                    "table '{}' has no relation '{}'",
                    spec.table, name
                )));
            }
        }

        Ok(())
    }

    /// Effective schema file path
    pub fn schema_path(&self, paths: &SnapPaths) -> PathBuf {
        self.schema_path
            .clone()
            .unwrap_or_else(|| paths.schema_file())
    }

    /// Effective data directory
    pub fn data_dir(&self, paths: &SnapPaths) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| paths.data_dir())
    }

    /// Effective backups root
    pub fn backups_dir(&self, paths: &SnapPaths) -> PathBuf {
        self.backups_dir
            .clone()
            .unwrap_or_else(|| paths.backup_dir())
    }
}
