use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const INSERT_PREFIX: &str = "INSERT INTO";

/// One rendered INSERT statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedStatement {
    pub sql: String,
    /// Qualified name of the table the statement targets.
    pub source_table: String,
}

impl GeneratedStatement {
    pub fn new(sql: impl Into<String>, source_table: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            source_table: source_table.into(),
        }
    }

    /// Wrap a raw `INSERT INTO ...` line, reading the target table from its text.
    pub fn from_sql(sql: &str) -> Option<Self> {
        let sql = sql.trim();
        let head = sql.get(..INSERT_PREFIX.len())?;
        if !head.eq_ignore_ascii_case(INSERT_PREFIX) {
            return None;
        }
        let rest = sql.get(INSERT_PREFIX.len()..)?.trim_start();
        let table: String = rest
            .chars()
            .take_while(|ch| !ch.is_whitespace() && *ch != '(')
            .collect();
        if table.is_empty() {
            return None;
        }
        Some(Self::new(sql, table.replace('"', "")))
    }
}

/// Ordered, table-grouped batch of generated statements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct StatementSet {
    statements: Vec<GeneratedStatement>,
}

impl StatementSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: GeneratedStatement) {
        self.statements.push(statement);
    }

    pub fn extend(&mut self, other: StatementSet) {
        self.statements.extend(other.statements);
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GeneratedStatement> {
        self.statements.iter()
    }

    pub fn as_slice(&self) -> &[GeneratedStatement] {
        &self.statements
    }

    /// Distinct target tables in first-seen order.
    pub fn tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = Vec::new();
        for statement in &self.statements {
            if !tables.contains(&statement.source_table.as_str()) {
                tables.push(statement.source_table.as_str());
            }
        }
        tables
    }

    pub fn for_table<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a GeneratedStatement> {
        self.statements
            .iter()
            .filter(move |statement| statement.source_table == table)
    }

    /// Plain SQL script, one statement per line.
    pub fn to_sql_text(&self) -> String {
        self.statements
            .iter()
            .map(|statement| statement.sql.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromIterator<GeneratedStatement> for StatementSet {
    fn from_iter<I: IntoIterator<Item = GeneratedStatement>>(iter: I) -> Self {
        Self {
            statements: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for StatementSet {
    type Item = GeneratedStatement;
    type IntoIter = std::vec::IntoIter<GeneratedStatement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.into_iter()
    }
}

impl<'a> IntoIterator for &'a StatementSet {
    type Item = &'a GeneratedStatement;
    type IntoIter = std::slice::Iter<'a, GeneratedStatement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_target_table_from_sql() {
        let statement = GeneratedStatement::from_sql(
            "INSERT INTO kmznmst.tb_wflow_info (wflow_inst_id) VALUES ('C1');",
        )
        .expect("insert statement");
        assert_eq!(statement.source_table, "kmznmst.tb_wflow_info");

        let quoted = GeneratedStatement::from_sql(r#"insert into "app"."Orders"("id") values (1);"#)
            .expect("insert statement");
        assert_eq!(quoted.source_table, "app.Orders");

        assert!(GeneratedStatement::from_sql("SELECT 1;").is_none());
    }

    #[test]
    fn groups_tables_in_first_seen_order() {
        let set: StatementSet = [
            GeneratedStatement::new("a1", "s.a"),
            GeneratedStatement::new("b1", "s.b"),
            GeneratedStatement::new("a2", "s.a"),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.tables(), vec!["s.a", "s.b"]);
        assert_eq!(set.for_table("s.a").count(), 2);
        assert_eq!(set.to_sql_text(), "a1\nb1\na2");
    }
}
