//! Per-table extraction
//!
//! Each table is fetched in one call to the data source. Any error is kept
//! local to that table: the result comes back empty and flagged instead of
//! aborting the rest of the snapshot.

use tracing::{debug, warn};

use crate::source::{DataSource, Row, TableId, TableSpec};

/// Rows fetched for one table, or an empty flagged result on failure
#[derive(Debug, Clone, PartialEq)]
pub struct TableResult {
    pub table: TableId,
    pub rows: Vec<Row>,
    /// Error message when the fetch failed
    pub error: Option<String>,
}

impl TableResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Fetches single tables from a borrowed data source session
pub struct TableExtractor<'a, S: DataSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: DataSource + ?Sized> TableExtractor<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Fetch all rows of `spec.table` with its relations expanded
    ///
    /// Never fails; a source error becomes an empty result with `error` set.
    pub fn extract(&self, spec: &TableSpec) -> TableResult {
        match self.source.fetch_all(spec.table, &spec.include) {
            Ok(rows) => {
                debug!(table = %spec.table, rows = rows.len(), "Extracted table");
                TableResult {
                    table: spec.table,
                    rows,
                    error: None,
                }
            }
            Err(e) => {
                warn!(
                    table = %spec.table,
                    source = self.source.name(),
                    error = %e,
                    "Table extraction failed, continuing without it"
                );
                TableResult {
                    table: spec.table,
                    rows: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{SnapError, SnapResult};
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory source for pipeline tests; tables not registered fail
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub tables: HashMap<TableId, Vec<Row>>,
        pub calls: RefCell<Vec<TableId>>,
        pub disconnected: bool,
    }

    impl FakeSource {
        pub fn with_rows(mut self, table: TableId, count: usize) -> Self {
            let rows = (0..count)
                .map(|i| {
                    json!({"id": i + 1, "table": table.as_str()})
                        .as_object()
                        .cloned()
                        .unwrap()
                })
                .collect();
            self.tables.insert(table, rows);
            self
        }
    }

    impl DataSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        fn fetch_all(&self, table: TableId, _include: &[String]) -> SnapResult<Vec<Row>> {
            self.calls.borrow_mut().push(table);
            if self.disconnected {
                return Err(SnapError::Connection("closed".into()));
            }
            self.tables
                .get(&table)
                .cloned()
                .ok_or_else(|| SnapError::Source(format!("relation \"{}\" does not exist", table)))
        }

        fn disconnect(&mut self) -> SnapResult<()> {
            self.disconnected = true;
            Ok(())
        }
    }

    #[test]
    fn test_extract_success() {
        let source = FakeSource::default().with_rows(TableId::Users, 3);
        let extractor = TableExtractor::new(&source);

        let result = extractor.extract(&TableSpec::new(TableId::Users).with("patients"));
        assert!(result.succeeded());
        assert_eq!(result.row_count(), 3);
        assert_eq!(result.table, TableId::Users);
    }

    #[test]
    fn test_extract_failure_is_soft() {
        let source = FakeSource::default();
        let extractor = TableExtractor::new(&source);

        let result = extractor.extract(&TableSpec::new(TableId::Settings));
        assert!(!result.succeeded());
        assert_eq!(result.row_count(), 0);
        assert!(result.error.unwrap().contains("does not exist"));
    }

    #[test]
    fn test_extract_empty_table_is_success() {
        let source = FakeSource::default().with_rows(TableId::Notifications, 0);
        let extractor = TableExtractor::new(&source);

        let result = extractor.extract(&TableSpec::new(TableId::Notifications));
        assert!(result.succeeded());
        assert_eq!(result.row_count(), 0);
    }

    #[test]
    fn test_one_call_per_extract() {
        let source = FakeSource::default().with_rows(TableId::Users, 1);
        let extractor = TableExtractor::new(&source);

        extractor.extract(&TableSpec::new(TableId::Users));
        assert_eq!(*source.calls.borrow(), vec![TableId::Users]);
    }
}
