use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use rowscribe_core::{ColumnDescriptor, ColumnValue, Error, ExtractedRow, Result, SqlValue, TableRef};

use crate::extractor::{Extraction, Filter, TableExtractor};

struct MemoryTable {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Vec<SqlValue>>,
}

/// Fixture-backed extractor for dry runs and tests.
///
/// Filters are recorded but not evaluated: every registered row is returned.
#[derive(Default)]
pub struct MemoryExtractor {
    tables: HashMap<TableRef, MemoryTable>,
    failures: HashMap<TableRef, String>,
    seen: Mutex<Vec<(TableRef, Filter)>>,
}

impl MemoryExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table; each row lists values in `columns` order.
    pub fn with_table(
        mut self,
        table: TableRef,
        columns: Vec<ColumnDescriptor>,
        rows: Vec<Vec<SqlValue>>,
    ) -> Self {
        self.tables.insert(table, MemoryTable { columns, rows });
        self
    }

    /// Make every extraction of `table` fail with a query error.
    pub fn with_failure(mut self, table: TableRef, message: impl Into<String>) -> Self {
        self.failures.insert(table, message.into());
        self
    }

    /// Extractions performed so far, in call order.
    pub fn calls(&self) -> Vec<(TableRef, Filter)> {
        self.seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }

    fn record(&self, table: &TableRef, filter: &Filter) -> Result<()> {
        let mut seen = self
            .seen
            .lock()
            .map_err(|_| Error::Query("memory extractor call log poisoned".to_string()))?;
        seen.push((table.clone(), filter.clone()));
        Ok(())
    }

    fn table(&self, table: &TableRef) -> Result<&MemoryTable> {
        if let Some(message) = self.failures.get(table) {
            return Err(Error::Query(message.clone()));
        }
        self.tables
            .get(table)
            .ok_or_else(|| Error::TableNotFound(table.qualified()))
    }
}

#[async_trait]
impl TableExtractor for MemoryExtractor {
    fn engine(&self) -> &'static str {
        "memory"
    }

    async fn columns(&self, table: &TableRef) -> Result<Vec<ColumnDescriptor>> {
        Ok(self.table(table)?.columns.clone())
    }

    async fn extract(&self, table: &TableRef, filter: &Filter) -> Result<Extraction> {
        self.record(table, filter)?;
        let stored = self.table(table)?;
        let rows = stored
            .rows
            .iter()
            .map(|values| {
                if values.len() != stored.columns.len() {
                    return Err(Error::Query(format!(
                        "{table}: fixture row has {} values for {} columns",
                        values.len(),
                        stored.columns.len()
                    )));
                }
                let values = stored
                    .columns
                    .iter()
                    .zip(values)
                    .map(|(column, value)| ColumnValue {
                        column: column.clone(),
                        value: value.clone(),
                    })
                    .collect();
                Ok(ExtractedRow::new(table.clone(), values))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Extraction {
            columns: stored.columns.clone(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_registered_rows_and_records_filters() {
        let table = TableRef::new("app", "users");
        let extractor = MemoryExtractor::new().with_table(
            table.clone(),
            vec![ColumnDescriptor::new("id", "int4")],
            vec![vec![SqlValue::Int(1)], vec![SqlValue::Int(2)]],
        );

        let extraction = extractor
            .extract(&table, &Filter::raw("id > 0"))
            .await
            .expect("extraction succeeds");
        assert_eq!(extraction.row_count(), 2);
        assert_eq!(extractor.calls().len(), 1);
    }

    #[tokio::test]
    async fn unknown_and_failing_tables_error() {
        let broken = TableRef::new("app", "broken");
        let extractor = MemoryExtractor::new().with_failure(broken.clone(), "boom");

        assert!(matches!(
            extractor.extract(&TableRef::new("app", "missing"), &Filter::all()).await,
            Err(Error::TableNotFound(_))
        ));
        assert!(matches!(
            extractor.extract(&broken, &Filter::all()).await,
            Err(Error::Query(_))
        ));
    }
}
