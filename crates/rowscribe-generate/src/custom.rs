use std::time::Instant;

use tracing::{debug, info};

use rowscribe_core::{ColumnRules, Error, Result, StatementSet, TableRef};
use rowscribe_extract::{Filter, TableExtractor};

use crate::builder::StatementBuilder;
use crate::rules::{RuleContext, validate_rules};

/// Generate one INSERT per row of `table` matching `where_clause`.
///
/// Rules are validated against the declared columns before any row is read;
/// `CurrentTimestamp` emits a single instant for the whole batch.
pub async fn generate_custom(
    extractor: &dyn TableExtractor,
    table: &TableRef,
    where_clause: Option<&str>,
    rules: &ColumnRules,
) -> Result<StatementSet> {
    generate_custom_at(extractor, table, where_clause, rules, RuleContext::now()).await
}

/// [`generate_custom`] with a caller-fixed batch instant.
pub async fn generate_custom_at(
    extractor: &dyn TableExtractor,
    table: &TableRef,
    where_clause: Option<&str>,
    rules: &ColumnRules,
    ctx: RuleContext,
) -> Result<StatementSet> {
    let started = Instant::now();
    let columns = extractor.columns(table).await?;
    if columns.is_empty() {
        return Err(Error::TableNotFound(table.qualified()));
    }
    validate_rules(&columns, rules)?;

    let filter = where_clause.map(Filter::raw).unwrap_or_else(Filter::all);
    debug!(
        table = %table,
        filter = filter.normalized_clause().as_deref().unwrap_or(""),
        rules = rules.len(),
        "custom generation started"
    );
    let extraction = extractor.extract(table, &filter).await?;

    let builder = StatementBuilder::new(table, &extraction.columns, rules, ctx);
    let statements = builder.build_all(&extraction.rows)?;

    info!(
        table = %table,
        rows = extraction.row_count(),
        statements = statements.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "custom generation completed"
    );
    Ok(statements)
}
