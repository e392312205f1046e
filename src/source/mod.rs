//! Data source abstraction for snapvault
//!
//! The snapshot pipeline never talks to a database directly. It is handed a
//! `DataSource` session that can fetch every row of a table, optionally with
//! named relationships expanded into each row.
//!
//! The bundled `JsonDirSource` reads one JSON array per table from a data
//! directory.

pub mod json_dir;
pub mod table;

pub use json_dir::JsonDirSource;
pub use table::{RelationDef, RelationKind, TableId, TableSpec};

use crate::error::SnapResult;

/// A single row: column name to value
pub type Row = serde_json::Map<String, serde_json::Value>;

/// An open session against the database being backed up
pub trait DataSource {
    /// Human-readable name of the source, used in logs
    fn name(&self) -> &str;

    /// Fetch all rows of `table`, embedding each relation listed in `include`
    fn fetch_all(&self, table: TableId, include: &[String]) -> SnapResult<Vec<Row>>;

    /// Release the session. Fetches after this fail.
    fn disconnect(&mut self) -> SnapResult<()>;
}
