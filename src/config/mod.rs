//! Configuration module for snapvault
//!
//! This module provides configuration management including:
//! - XDG-compliant path resolution
//! - Persisted settings (table plan, layout, retention)

pub mod paths;
pub mod settings;

pub use paths::SnapPaths;
pub use settings::{DirectoryLayout, ManifestNaming, RetentionPolicy, Settings};
