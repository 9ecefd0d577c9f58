use rowscribe_core::{
    ColumnDescriptor, ColumnValue, Error, ExtractedRow, Result, SqlValue, TableRef,
};

use super::queries::RawColumn;

pub fn map_columns(raw: Vec<RawColumn>) -> Vec<ColumnDescriptor> {
    raw.into_iter()
        .map(|column| ColumnDescriptor::new(column.name, column.sql_type))
        .collect()
}

/// Pair each text cell with its declared column and parse it per type family.
pub fn map_row(
    table: &TableRef,
    columns: &[ColumnDescriptor],
    cells: Vec<Option<String>>,
) -> Result<ExtractedRow> {
    if cells.len() != columns.len() {
        return Err(Error::Query(format!(
            "{table}: expected {} columns, query returned {}",
            columns.len(),
            cells.len()
        )));
    }
    let values = columns
        .iter()
        .zip(cells)
        .map(|(column, cell)| ColumnValue {
            column: column.clone(),
            value: SqlValue::from_db_text(column.family(), cell.as_deref()),
        })
        .collect();
    Ok(ExtractedRow::new(table.clone(), values))
}
