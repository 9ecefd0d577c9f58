use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::SqlValue;

/// Schema used when a table reference carries no schema qualifier.
pub const DEFAULT_SCHEMA: &str = "public";

/// Schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// `schema.name`, the form used in generated statements and reports.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

impl FromStr for TableRef {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        let (schema, name) = match value.split_once('.') {
            Some((schema, name)) => (schema.trim(), name.trim()),
            None => (DEFAULT_SCHEMA, value),
        };
        if schema.is_empty() || name.is_empty() || name.contains('.') {
            return Err(Error::Validation(format!(
                "invalid table reference '{value}', expected schema.table"
            )));
        }
        Ok(TableRef::new(schema, name))
    }
}

/// Coarse classification of a Postgres type, deciding how values are quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TypeFamily {
    Integer,
    Numeric,
    Float,
    Boolean,
    Text,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Json,
    Uuid,
    Bytes,
    Other,
}

impl TypeFamily {
    /// Classify a Postgres `udt_name` (or formatted type name).
    pub fn from_sql_type(sql_type: &str) -> Self {
        let normalized = sql_type.trim().to_lowercase();
        let base = normalized
            .split('(')
            .next()
            .unwrap_or_default()
            .trim();
        if base.starts_with('_') || base.ends_with("[]") {
            return TypeFamily::Other;
        }
        match base {
            "int2" | "int4" | "int8" | "smallint" | "integer" | "bigint" | "int" | "serial"
            | "bigserial" | "smallserial" | "oid" => TypeFamily::Integer,
            "numeric" | "decimal" => TypeFamily::Numeric,
            "float4" | "float8" | "real" | "double precision" => TypeFamily::Float,
            "bool" | "boolean" => TypeFamily::Boolean,
            "varchar" | "character varying" | "bpchar" | "char" | "character" | "text"
            | "name" | "citext" => TypeFamily::Text,
            "date" => TypeFamily::Date,
            "time" | "timetz" | "time without time zone" | "time with time zone" => {
                TypeFamily::Time
            }
            "timestamp" | "timestamp without time zone" => TypeFamily::Timestamp,
            "timestamptz" | "timestamp with time zone" => TypeFamily::TimestampTz,
            "json" | "jsonb" => TypeFamily::Json,
            "uuid" => TypeFamily::Uuid,
            "bytea" => TypeFamily::Bytes,
            _ => TypeFamily::Other,
        }
    }

    /// Families rendered without quotes.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            TypeFamily::Integer | TypeFamily::Numeric | TypeFamily::Float
        )
    }
}

/// Column name plus declared SQL type, loaded once per table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnDescriptor {
    pub name: String,
    pub sql_type: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }

    pub fn family(&self) -> TypeFamily {
        TypeFamily::from_sql_type(&self.sql_type)
    }
}

/// One column of an extracted row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnValue {
    pub column: ColumnDescriptor,
    pub value: SqlValue,
}

/// A row read from a table, in the order the data source returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedRow {
    pub table: TableRef,
    values: Vec<ColumnValue>,
}

impl ExtractedRow {
    pub fn new(table: TableRef, values: Vec<ColumnValue>) -> Self {
        Self { table, values }
    }

    /// Value for a column, matched by exact name.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values
            .iter()
            .find(|entry| entry.column.name == column)
            .map(|entry| &entry.value)
    }

    pub fn values(&self) -> &[ColumnValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
