use thiserror::Error;

/// Error taxonomy shared across rowscribe crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad input shape: equal migration ids, empty replace pattern, unknown column.
    #[error("validation error: {0}")]
    Validation(String),
    /// The requested table has no visible columns.
    #[error("table not found: {0}")]
    TableNotFound(String),
    /// Failure reported by the query layer.
    #[error("query error: {0}")]
    Query(String),
    /// A declared column could not be rendered as a SQL literal.
    #[error("invalid value for column '{column}' ({value}): {reason}")]
    InvalidColumnValue {
        column: String,
        value: String,
        reason: String,
    },
    /// A row does not carry every declared column.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    /// The external identifier conversion failed or timed out.
    #[error("conversion failed: {0}")]
    ConversionFailed(String),
}

impl Error {
    /// Stable machine-readable code for reports and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::TableNotFound(_) => "TABLE_NOT_FOUND",
            Error::Query(_) => "QUERY_ERROR",
            Error::InvalidColumnValue { .. } => "INVALID_COLUMN_VALUE",
            Error::SchemaMismatch(_) => "SCHEMA_MISMATCH",
            Error::ConversionFailed(_) => "CONVERSION_FAILED",
        }
    }

    pub fn invalid_value(
        column: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidColumnValue {
            column: column.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for results returned by rowscribe crates.
pub type Result<T> = std::result::Result<T, Error>;
