//! SELECT rendering for extraction queries.

use rowscribe_core::{ColumnDescriptor, TableRef, quote_ident};

use crate::extractor::Filter;

/// `SELECT` every declared column cast to text, so values can be parsed per
/// declared type without driver-specific decoding.
pub fn build_select(
    table: &TableRef,
    columns: &[ColumnDescriptor],
    filter: &Filter,
    limit: Option<usize>,
) -> String {
    let projection = columns
        .iter()
        .map(|column| {
            let ident = quote_ident(&column.name);
            format!("{ident}::text AS {ident}")
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "SELECT {projection} FROM {}.{}",
        quote_ident(&table.schema),
        quote_ident(&table.name)
    );
    if let Some(clause) = filter.normalized_clause() {
        sql.push_str(" WHERE ");
        sql.push_str(&clause);
    }
    if let Some(limit) = limit {
        sql = format!("SELECT * FROM ({sql}) AS extracted LIMIT {limit}");
    }
    sql
}
