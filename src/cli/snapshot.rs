//! Snapshot CLI commands
//!
//! Implements CLI commands for taking, listing and pruning snapshots.

use chrono::Duration;
use clap::Subcommand;
use std::path::PathBuf;
use uuid::Uuid;

use crate::backup::{
    format_size, RetentionManager, RunLock, RunPlan, SchemaFingerprint, SnapshotRun,
};
use crate::config::paths::SnapPaths;
use crate::config::settings::{DirectoryLayout, Settings};
use crate::error::{SnapError, SnapResult};
use crate::source::{JsonDirSource, TableId, TableSpec};

/// Snapshot subcommands
#[derive(Subcommand)]
pub enum SnapshotCommands {
    /// Take a snapshot now and rotate old backups
    Run {
        /// Number of backup directories to keep (overrides config)
        #[arg(short, long)]
        keep: Option<u32>,

        /// Do not delete any old backups this run
        #[arg(long)]
        no_retention: bool,

        /// Data directory to read tables from (overrides config)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Schema definition file (overrides config)
        #[arg(long)]
        schema: Option<PathBuf>,

        /// One directory per run instead of one per day
        #[arg(long)]
        per_run: bool,

        /// Take over the run lock even if another run appears to hold it
        #[arg(long)]
        break_lock: bool,
    },

    /// List backup directories, newest first
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Delete old backup directories according to retention policy
    Prune {
        /// Number of backup directories to keep (overrides config)
        #[arg(short, long)]
        keep: Option<u32>,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Print the fingerprint of a schema file
    Fingerprint {
        /// Schema file (defaults to the configured schema)
        file: Option<PathBuf>,
    },

    /// Show the configured table plan
    Tables,
}

/// Handle a snapshot command
pub fn handle_snapshot_command(
    paths: &SnapPaths,
    settings: &Settings,
    cmd: SnapshotCommands,
) -> SnapResult<()> {
    match cmd {
        SnapshotCommands::Run {
            keep,
            no_retention,
            data_dir,
            schema,
            per_run,
            break_lock,
        } => {
            let mut settings = settings.clone();
            if let Some(keep) = keep {
                settings.retention.keep = keep;
            }
            if no_retention {
                settings.retention.enabled = false;
            }
            if data_dir.is_some() {
                settings.data_dir = data_dir;
            }
            if schema.is_some() {
                settings.schema_path = schema;
            }
            if per_run {
                settings.layout = DirectoryLayout::PerRun;
            }
            settings.validate()?;

            let source = JsonDirSource::connect(settings.data_dir(paths))?;
            let mut plan = RunPlan::from_settings(&settings, paths);
            if break_lock {
                plan.lock_stale_after = Duration::zero();
            }
            let summary = SnapshotRun::new(source, plan).execute()?;

            println!("{}", summary);
        }

        SnapshotCommands::List { verbose } => {
            let manager = RetentionManager::new(settings.backups_dir(paths));
            let backups = manager.list()?;

            if backups.is_empty() {
                println!("No backups found.");
                println!("Create one with: snapvault run");
                return Ok(());
            }

            println!("Available Backups");
            println!("=================");
            println!();

            for (i, backup) in backups.iter().enumerate() {
                if verbose {
                    println!(
                        "{}. {}\n   Path: {}\n   Snapshots: {}\n   Size: {}\n",
                        i + 1,
                        backup.name,
                        backup.path.display(),
                        backup.snapshot_count,
                        format_size(backup.size_bytes),
                    );
                } else {
                    println!(
                        "  {}. {} ({} snapshot(s), {})",
                        i + 1,
                        backup.name,
                        backup.snapshot_count,
                        format_size(backup.size_bytes),
                    );
                }
            }

            println!();
            println!("Total: {} backup(s)", backups.len());
        }

        SnapshotCommands::Prune { keep, force } => {
            let keep = keep.unwrap_or(settings.retention.keep);
            if keep == 0 {
                return Err(SnapError::Validation("--keep must be at least 1".into()));
            }

            let root = settings.backups_dir(paths);
            let manager = RetentionManager::new(&root);
            let doomed = manager.plan(keep as usize)?;

            if doomed.is_empty() {
                println!("No backups to prune.");
                println!("Current retention policy: keep {}", keep);
                return Ok(());
            }

            println!("Prune Summary");
            println!("=============");
            println!("Retention policy: keep {}", keep);
            println!("To be deleted ({}):", doomed.len());
            for name in &doomed {
                println!("  {}", name);
            }
            println!();

            if !force {
                println!("To delete old backups, run again with --force flag:");
                println!("  snapvault prune --force");
                return Ok(());
            }

            // Serialized with runs against the same root
            let _lock = if settings.lock {
                Some(RunLock::acquire(
                    &root,
                    Uuid::new_v4(),
                    Duration::minutes(i64::from(settings.lock_stale_minutes)),
                )?)
            } else {
                None
            };
            let deleted = manager.rotate(keep as usize)?;
            println!("Deleted {} backup(s).", deleted.len());
            if deleted.len() < doomed.len() {
                println!(
                    "{} backup(s) could not be deleted; see warnings above.",
                    doomed.len() - deleted.len()
                );
            }
        }

        SnapshotCommands::Fingerprint { file } => {
            let path = file.unwrap_or_else(|| settings.schema_path(paths));
            let fingerprint = SchemaFingerprint::from_file(&path);
            println!("{}", fingerprint);
        }

        SnapshotCommands::Tables => {
            println!("Backup Plan ({} tables)", settings.tables.len());
            println!("===========");
            for (i, spec) in settings.tables.iter().enumerate() {
                println!("  {}. {}", i + 1, describe_spec(spec));
            }
            let skipped: Vec<&str> = TableId::ALL
                .iter()
                .filter(|t| !settings.tables.iter().any(|s| s.table == **t))
                .map(|t| t.as_str())
                .collect();
            if !skipped.is_empty() {
                println!();
                println!("Not backed up: {}", skipped.join(", "));
            }
        }
    }

    Ok(())
}

fn describe_spec(spec: &TableSpec) -> String {
    if spec.include.is_empty() {
        spec.table.to_string()
    } else {
        format!("{} (with {})", spec.table, spec.include.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_spec() {
        assert_eq!(describe_spec(&TableSpec::new(TableId::Settings)), "settings");
        assert_eq!(
            describe_spec(&TableSpec::new(TableId::Doctors).with("user").with("department")),
            "doctors (with user, department)"
        );
    }
}
