use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use snapvault::cli::{handle_snapshot_command, SnapshotCommands};
use snapvault::config::paths::SnapPaths;
use snapvault::config::settings::Settings;

#[derive(Parser)]
#[command(
    name = "snapvault",
    author = "Kaylee Beyene",
    version,
    about = "Point-in-time database snapshots with rolling retention",
    long_about = "snapvault extracts every table of a database into a single \
                  dependency-ordered JSON snapshot, fingerprints the schema to \
                  spot drift between snapshots, and keeps only the newest \
                  backup directories."
)]
struct Cli {
    /// Home directory holding config.json, data/ and backups/
    #[arg(long, global = true, env = "SNAPVAULT_HOME")]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Snapshot(SnapshotCommands),

    /// Create the home directory and a default config
    Init,

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let paths = match cli.home {
        Some(home) => SnapPaths::with_base_dir(home),
        None => SnapPaths::new()?,
    };
    let settings = Settings::load_or_create(&paths)?;

    match cli.command {
        Some(Commands::Snapshot(cmd)) => {
            handle_snapshot_command(&paths, &settings, cmd)?;
        }
        Some(Commands::Init) => {
            println!("Initializing snapvault at: {}", paths.base_dir().display());
            paths.ensure_directories()?;
            if paths.is_initialized() {
                println!("Config already exists, leaving it unchanged.");
            } else {
                settings.save(&paths)?;
            }
            println!("Initialization complete!");
            println!();
            println!("Place one <table>.json file per table in: {}", settings.data_dir(&paths).display());
            println!("Schema file: {}", settings.schema_path(&paths).display());
            println!();
            println!("Run 'snapvault run' to take the first snapshot.");
        }
        Some(Commands::Config) => {
            println!("snapvault Configuration");
            println!("=======================");
            println!("Home directory:   {}", paths.base_dir().display());
            println!("Config file:      {}", paths.settings_file().display());
            println!("Data directory:   {}", settings.data_dir(&paths).display());
            println!("Backup directory: {}", settings.backups_dir(&paths).display());
            println!("Schema file:      {}", settings.schema_path(&paths).display());
            println!();
            println!("Settings:");
            println!("  Database:  {}", settings.database_name);
            println!("  Tables:    {}", settings.tables.len());
            println!("  Layout:    {:?}", settings.layout);
            println!("  Manifest:  {:?}", settings.manifest);
            if settings.retention.enabled {
                println!("  Retention: keep {}", settings.retention.keep);
            } else {
                println!("  Retention: disabled");
            }
            println!("  Run lock:  {} (stale after {} min)", settings.lock, settings.lock_stale_minutes);
        }
        None => {
            println!("snapvault - point-in-time database snapshots");
            println!();
            println!("Run 'snapvault --help' for usage information.");
            println!("Run 'snapvault run' to take a snapshot.");
        }
    }

    Ok(())
}

/// Log to stderr so stdout carries only command output
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
