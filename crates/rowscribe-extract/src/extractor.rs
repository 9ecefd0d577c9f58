use async_trait::async_trait;

use rowscribe_core::{ColumnDescriptor, ExtractedRow, Result, TableRef};

/// Row filter appended after an implicit `WHERE`.
///
/// `clause` is operator-supplied SQL and is passed through verbatim; the query
/// layer is responsible for running it on a suitably privileged connection.
/// `params` bind `$1..$n` placeholders as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub clause: Option<String>,
    pub params: Vec<String>,
}

impl Filter {
    /// Every row of the table.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn raw(clause: impl Into<String>) -> Self {
        Self {
            clause: Some(clause.into()),
            params: Vec::new(),
        }
    }

    pub fn bound(clause: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            clause: Some(clause.into()),
            params,
        }
    }

    /// Clause ready to follow `WHERE`, or `None` for all rows.
    pub fn normalized_clause(&self) -> Option<String> {
        let clause = self.clause.as_deref()?.trim();
        let clause = clause.trim_end_matches(';').trim_end();
        let clause = match clause.get(..5) {
            Some(head)
                if head.eq_ignore_ascii_case("where")
                    && clause[5..]
                        .chars()
                        .next()
                        .is_none_or(|ch| ch.is_whitespace() || ch == '(') =>
            {
                clause[5..].trim_start()
            }
            _ => clause,
        };
        (!clause.is_empty()).then(|| clause.to_string())
    }
}

/// Rows and column metadata returned by one extraction call.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<ExtractedRow>,
}

impl Extraction {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Source of table rows.
///
/// Implementations fail with `TableNotFound` when the table has no visible
/// columns and with `Query` for any data-layer error; they never return a
/// partial row set.
#[async_trait]
pub trait TableExtractor: Send + Sync {
    /// Engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    /// Declared columns in ordinal order.
    async fn columns(&self, table: &TableRef) -> Result<Vec<ColumnDescriptor>>;

    /// Rows matching `filter`, with the table's declared columns.
    async fn extract(&self, table: &TableRef, filter: &Filter) -> Result<Extraction>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_where_and_semicolon() {
        let filter = Filter::raw("  WHERE wflow_inst_id LIKE '%HBDACM00';");
        assert_eq!(
            filter.normalized_clause().as_deref(),
            Some("wflow_inst_id LIKE '%HBDACM00'")
        );
    }

    #[test]
    fn keeps_columns_that_start_with_where() {
        let filter = Filter::raw("whereabouts = 'x'");
        assert_eq!(filter.normalized_clause().as_deref(), Some("whereabouts = 'x'"));
    }

    #[test]
    fn blank_clause_means_all_rows() {
        assert_eq!(Filter::raw("   ").normalized_clause(), None);
        assert_eq!(Filter::raw("where ;").normalized_clause(), None);
        assert_eq!(Filter::all().normalized_clause(), None);
    }
}
