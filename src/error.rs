//! Custom error types for snapvault
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for snapvault operations
#[derive(Error, Debug)]
pub enum SnapError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for settings and table plans
    #[error("Validation error: {0}")]
    Validation(String),

    /// Snapshot storage errors (writing the backup directory)
    #[error("Storage error: {0}")]
    Storage(String),

    /// The data source session could not be established or is closed
    #[error("Connection error: {0}")]
    Connection(String),

    /// A query against the data source failed
    #[error("Data source error: {0}")]
    Source(String),

    /// A table name that is not part of the schema
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// A relationship name the table does not define
    #[error("Unknown relation '{relation}' on table '{table}'")]
    UnknownRelation { table: String, relation: String },

    /// Another run holds the backup lock
    #[error("Backup directory is locked: {0}")]
    Locked(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },
}

impl SnapError {
    /// Create a "not found" error for backup directories
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Errors that abort a whole run rather than a single table
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Storage(_) | Self::Connection(_) | Self::Locked(_)
        )
    }
}

impl From<std::io::Error> for SnapError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SnapError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for snapvault operations
pub type SnapResult<T> = Result<T, SnapError>;
