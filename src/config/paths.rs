//! Path management for snapvault
//!
//! Provides XDG-compliant path resolution for configuration, source data,
//! and backups.
//!
//! ## Path Resolution Order
//!
//! 1. `SNAPVAULT_HOME` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/snapvault` or `~/.config/snapvault`
//! 3. Windows: `%APPDATA%\snapvault`

use std::path::PathBuf;

use crate::error::SnapError;

/// Environment variable overriding the home directory
pub const HOME_ENV: &str = "SNAPVAULT_HOME";

/// Manages all paths used by snapvault
#[derive(Debug, Clone)]
pub struct SnapPaths {
    /// Base directory for all snapvault data
    base_dir: PathBuf,
}

impl SnapPaths {
    /// Create a new SnapPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, SnapError> {
        let base_dir = if let Ok(custom) = std::env::var(HOME_ENV) {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create SnapPaths with a custom base directory
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the source data directory (~/.config/snapvault/data/)
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the backup root (~/.config/snapvault/backups/)
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the default schema definition file
    pub fn schema_file(&self) -> PathBuf {
        self.base_dir.join("schema.prisma")
    }

    /// Ensure the base, data, and backup directories exist
    pub fn ensure_directories(&self) -> Result<(), SnapError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| SnapError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| SnapError::Io(format!("Failed to create data directory: {}", e)))?;

        std::fs::create_dir_all(self.backup_dir())
            .map_err(|e| SnapError::Io(format!("Failed to create backup directory: {}", e)))?;

        Ok(())
    }

    /// Check if snapvault has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, SnapError> {
    let config_base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) => PathBuf::from(xdg),
        Err(_) => {
            let home = std::env::var("HOME").map_err(|_| {
                SnapError::Config("Could not determine HOME directory".into())
            })?;
            PathBuf::from(home).join(".config")
        }
    };
    Ok(config_base.join("snapvault"))
}

#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, SnapError> {
    let appdata = std::env::var("APPDATA")
        .map_err(|_| SnapError::Config("Could not determine APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join("snapvault"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SnapPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.data_dir(), temp_dir.path().join("data"));
        assert_eq!(paths.backup_dir(), temp_dir.path().join("backups"));
        assert_eq!(paths.settings_file(), temp_dir.path().join("config.json"));
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SnapPaths::with_base_dir(temp_dir.path().join("home"));

        paths.ensure_directories().unwrap();

        assert!(paths.data_dir().exists());
        assert!(paths.backup_dir().exists());
        assert!(!paths.is_initialized());
    }
}
