//! JSON directory data source
//!
//! Reads a database export laid out as one `<table>.json` file per table,
//! each holding a JSON array of row objects. Relationships are resolved
//! in memory using the fixed relation table on `TableId`.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use super::table::{RelationDef, RelationKind, TableId};
use super::{DataSource, Row};
use crate::error::{SnapError, SnapResult};

/// Data source backed by a directory of per-table JSON files
#[derive(Debug)]
pub struct JsonDirSource {
    dir: PathBuf,
    name: String,
    connected: bool,
}

impl JsonDirSource {
    /// Open a session on `dir`
    ///
    /// # Errors
    ///
    /// Returns `SnapError::Connection` if the directory does not exist.
    pub fn connect(dir: impl AsRef<Path>) -> SnapResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(SnapError::Connection(format!(
                "Data directory not found: {}",
                dir.display()
            )));
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            name: format!("json:{}", dir.display()),
            connected: true,
        })
    }

    /// Path of the file holding `table`
    pub fn table_file(&self, table: TableId) -> PathBuf {
        self.dir.join(format!("{}.json", table.as_str()))
    }

    fn load_table(&self, table: TableId) -> SnapResult<Vec<Row>> {
        let path = self.table_file(table);
        if !path.exists() {
            return Err(SnapError::UnknownTable(format!(
                "{} (no file at {})",
                table,
                path.display()
            )));
        }

        let file = File::open(&path)
            .map_err(|e| SnapError::Source(format!("Failed to open {}: {}", path.display(), e)))?;

        let value: Value = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| SnapError::Source(format!("Failed to parse {}: {}", path.display(), e)))?;

        let Value::Array(items) = value else {
            return Err(SnapError::Source(format!(
                "{} does not contain a JSON array",
                path.display()
            )));
        };

        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(row) => Ok(row),
                _ => Err(SnapError::Source(format!(
                    "Row {} of table '{}' is not an object",
                    i, table
                ))),
            })
            .collect()
    }

    fn resolve_relations(&self, table: TableId, include: &[String]) -> SnapResult<Vec<&'static RelationDef>> {
        include
            .iter()
            .map(|name| {
                table.relation(name).ok_or_else(|| SnapError::UnknownRelation {
                    table: table.to_string(),
                    relation: name.clone(),
                })
            })
            .collect()
    }
}

/// Embed `relation` into every row, looking matches up in `targets`
fn expand(rows: &mut [Row], relation: &RelationDef, targets: &[Row]) {
    for row in rows.iter_mut() {
        let key = row.get(relation.local_key).cloned().unwrap_or(Value::Null);
        let matches = targets
            .iter()
            .filter(|t| !key.is_null() && t.get(relation.target_key) == Some(&key));

        let embedded = match relation.kind {
            RelationKind::ToOne => matches
                .map(|t| Value::Object(t.clone()))
                .next()
                .unwrap_or(Value::Null),
            RelationKind::ToMany => Value::Array(matches.map(|t| Value::Object(t.clone())).collect()),
        };

        row.insert(relation.name.to_string(), embedded);
    }
}

impl DataSource for JsonDirSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_all(&self, table: TableId, include: &[String]) -> SnapResult<Vec<Row>> {
        if !self.connected {
            return Err(SnapError::Connection("Session is closed".into()));
        }

        let relations = self.resolve_relations(table, include)?;
        let mut rows = self.load_table(table)?;

        for relation in relations {
            let targets = self.load_table(relation.target)?;
            debug!(
                table = %table,
                relation = relation.name,
                targets = targets.len(),
                "Expanding relation"
            );
            expand(&mut rows, relation, &targets);
        }

        Ok(rows)
    }

    fn disconnect(&mut self) -> SnapResult<()> {
        self.connected = false;
        Ok(())
    }
}
