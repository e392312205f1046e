//! snapvault - point-in-time database snapshots
//!
//! This library extracts every table of a database into a single,
//! self-describing JSON snapshot, records a fingerprint of the schema so
//! drift between snapshots can be spotted, and keeps only the newest N
//! backup directories.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `source`: Data source trait, table identifiers, JSON directory source
//! - `storage`: Atomic JSON file writes
//! - `backup`: Fingerprinting, extraction, writing, retention, run coordination
//! - `cli`: Command handlers for the `snapvault` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use snapvault::config::{paths::SnapPaths, settings::Settings};
//!
//! let paths = SnapPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod source;
pub mod storage;

pub use error::{SnapError, SnapResult};
