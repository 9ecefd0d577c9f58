use rowscribe_core::{
    ColumnDescriptor, ColumnRules, Error, ExtractedRow, GeneratedStatement, Result,
    StatementSet, TableRef, display_ident,
};

use crate::rules::{RuleContext, apply};

/// Renders INSERT statements for rows of one table.
///
/// The table and column lists are rendered once; every row is then walked in
/// declared column order, never in the order the row carries its values.
#[derive(Debug, Clone)]
pub struct StatementBuilder<'a> {
    table: &'a TableRef,
    columns: &'a [ColumnDescriptor],
    rules: &'a ColumnRules,
    ctx: RuleContext,
    target: String,
    column_list: String,
}

impl<'a> StatementBuilder<'a> {
    pub fn new(
        table: &'a TableRef,
        columns: &'a [ColumnDescriptor],
        rules: &'a ColumnRules,
        ctx: RuleContext,
    ) -> Self {
        let target = format!(
            "{}.{}",
            display_ident(&table.schema),
            display_ident(&table.name)
        );
        let column_list = columns
            .iter()
            .map(|column| display_ident(&column.name))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            table,
            columns,
            rules,
            ctx,
            target,
            column_list,
        }
    }

    pub fn build(&self, row: &ExtractedRow) -> Result<GeneratedStatement> {
        let mut literals = Vec::with_capacity(self.columns.len());
        for column in self.columns {
            let raw = row.get(&column.name).ok_or_else(|| {
                Error::SchemaMismatch(format!(
                    "row of {} has no value for declared column '{}'",
                    self.table, column.name
                ))
            })?;
            literals.push(apply(column, raw, self.rules.rule_for(&column.name), &self.ctx)?);
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({});",
            self.target,
            self.column_list,
            literals.join(", ")
        );
        Ok(GeneratedStatement::new(sql, self.table.qualified()))
    }

    /// Render every row, failing on the first error with no partial batch.
    pub fn build_all(&self, rows: &[ExtractedRow]) -> Result<StatementSet> {
        rows.iter().map(|row| self.build(row)).collect()
    }
}

/// Render a single row.
pub fn build(
    table: &TableRef,
    columns: &[ColumnDescriptor],
    row: &ExtractedRow,
    rules: &ColumnRules,
    ctx: &RuleContext,
) -> Result<GeneratedStatement> {
    StatementBuilder::new(table, columns, rules, *ctx).build(row)
}

#[cfg(test)]
mod tests {
    use rowscribe_core::{ColumnRule, ColumnValue, SqlValue};

    use super::*;

    fn table() -> TableRef {
        TableRef::new("kmznmst", "tb_cdrcoll_srvr_info")
    }

    fn columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("srvr_id", "varchar"),
            ColumnDescriptor::new("port_no", "int4"),
            ColumnDescriptor::new("User", "varchar"),
        ]
    }

    fn row(values: Vec<(ColumnDescriptor, SqlValue)>) -> ExtractedRow {
        ExtractedRow::new(
            table(),
            values
                .into_iter()
                .map(|(column, value)| ColumnValue { column, value })
                .collect(),
        )
    }

    #[test]
    fn renders_declared_order_regardless_of_row_order() {
        let columns = columns();
        let shuffled = row(vec![
            (columns[2].clone(), SqlValue::Text("ops".to_string())),
            (columns[0].clone(), SqlValue::Text("NE001".to_string())),
            (columns[1].clone(), SqlValue::Int(21)),
        ]);

        let statement = build(
            &table(),
            &columns,
            &shuffled,
            &ColumnRules::new(),
            &RuleContext::now(),
        )
        .expect("statement renders");

        assert_eq!(
            statement.sql,
            "INSERT INTO kmznmst.tb_cdrcoll_srvr_info (srvr_id, port_no, \"User\") VALUES ('NE001', 21, 'ops');"
        );
        assert_eq!(statement.source_table, "kmznmst.tb_cdrcoll_srvr_info");
    }

    #[test]
    fn missing_column_is_a_schema_mismatch() {
        let columns = columns();
        let partial = row(vec![(columns[0].clone(), SqlValue::Text("NE001".to_string()))]);

        let err = build(
            &table(),
            &columns,
            &partial,
            &ColumnRules::new(),
            &RuleContext::now(),
        )
        .expect_err("missing column");
        assert_eq!(err.code(), "SCHEMA_MISMATCH");
    }

    #[test]
    fn build_all_fails_without_partial_batch() {
        let columns = columns();
        let rules = ColumnRules::new().with(
            "port_no",
            ColumnRule::ReplaceLiteral {
                old: "2".to_string(),
                new: "x".to_string(),
            },
        );
        let good = row(vec![
            (columns[0].clone(), SqlValue::Text("NE001".to_string())),
            (columns[1].clone(), SqlValue::Int(11)),
            (columns[2].clone(), SqlValue::Null),
        ]);
        let bad = row(vec![
            (columns[0].clone(), SqlValue::Text("NE002".to_string())),
            (columns[1].clone(), SqlValue::Int(21)),
            (columns[2].clone(), SqlValue::Null),
        ]);

        let table = table();
        let builder = StatementBuilder::new(&table, &columns, &rules, RuleContext::now());
        assert_eq!(builder.build_all(std::slice::from_ref(&good)).expect("ok").len(), 1);
        let err = builder.build_all(&[good, bad]).expect_err("second row fails");
        assert!(matches!(err, Error::InvalidColumnValue { ref column, .. } if column == "port_no"));
    }
}
