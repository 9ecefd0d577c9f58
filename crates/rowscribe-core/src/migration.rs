use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::statement::StatementSet;

/// Request to rewrite the rows of one network element under a new identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MigrationRequest {
    pub source_id: String,
    pub target_id: String,
}

impl MigrationRequest {
    /// Build a validated request; identifiers are trimmed.
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>) -> Result<Self> {
        let request = Self {
            source_id: source_id.into().trim().to_string(),
            target_id: target_id.into().trim().to_string(),
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source_id.trim().is_empty() || self.target_id.trim().is_empty() {
            return Err(Error::Validation(
                "both source and target NE ids are required".to_string(),
            ));
        }
        if self.source_id.trim() == self.target_id.trim() {
            return Err(Error::Validation(format!(
                "source and target NE ids must differ (both '{}')",
                self.source_id.trim()
            )));
        }
        Ok(())
    }
}

/// Lifecycle of a single migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "state", content = "table", rename_all = "snake_case")]
pub enum MigrationState {
    Pending,
    Extracting(String),
    Converting,
    Done,
    Failed,
}

/// Extraction outcome for one of the fixed migration tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TableOutcome {
    pub table: String,
    pub statements: StatementSet,
    /// Extraction or rendering failure; the table then contributes no statements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableOutcome {
    pub fn count(&self) -> usize {
        self.statements.len()
    }
}

/// Result of a migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MigrationResult {
    pub source_id: String,
    pub target_id: String,
    /// Per-table statements in declared table order.
    pub per_table: Vec<TableOutcome>,
    pub original_count: usize,
    /// `None` when nothing was extracted and no conversion was attempted.
    pub converted_statements: Option<StatementSet>,
    /// Conversion failed and `converted_statements` holds the original batch.
    pub used_fallback: bool,
    /// Unparsed answer of the conversion service, when it answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl MigrationResult {
    pub fn table(&self, name: &str) -> Option<&TableOutcome> {
        self.per_table.iter().find(|outcome| outcome.table == name)
    }

    /// Concatenation of all per-table statements in declared order.
    pub fn original_statements(&self) -> StatementSet {
        let mut all = StatementSet::new();
        for outcome in &self.per_table {
            all.extend(outcome.statements.clone());
        }
        all
    }

    /// Statements an operator should apply: converted when available.
    pub fn final_statements(&self) -> StatementSet {
        self.converted_statements
            .clone()
            .unwrap_or_else(|| self.original_statements())
    }

    pub fn tables_with_data(&self) -> usize {
        self.per_table
            .iter()
            .filter(|outcome| !outcome.statements.is_empty())
            .count()
    }

    pub fn failed_tables(&self) -> impl Iterator<Item = &TableOutcome> {
        self.per_table.iter().filter(|outcome| outcome.error.is_some())
    }
}

/// Row counts per migration table, without rendering or conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TablePreview {
    pub table: String,
    pub rows: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MigrationPreview {
    pub source_id: String,
    pub tables: Vec<TablePreview>,
    pub total_rows: usize,
}

impl MigrationPreview {
    pub fn tables_with_data(&self) -> usize {
        self.tables.iter().filter(|table| table.rows > 0).count()
    }
}
