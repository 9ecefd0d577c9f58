//! Identifier conversion of a rendered statement batch.

mod chat;

use async_trait::async_trait;

use rowscribe_core::{GeneratedStatement, Result, StatementSet};

pub use chat::{ChatServiceConfig, ChatServiceConverter, Verification, verification_input};

/// Statements returned by a converter, plus the answer they were parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub statements: StatementSet,
    pub raw_response: String,
}

/// Rewrites a batch of INSERTs from one NE id to another.
///
/// Every failure, including an answer with no usable statement, is reported
/// as `ConversionFailed`.
#[async_trait]
pub trait IdentifierConverter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn convert(
        &self,
        statements: &StatementSet,
        source_id: &str,
        target_id: &str,
    ) -> Result<Conversion>;
}

/// Request text sent to the translation service.
pub fn conversion_prompt(source_id: &str, target_id: &str, statements: &StatementSet) -> String {
    format!(
        "기존 NE_ID: {source_id}\n신규 NE_ID: {target_id}\n{}",
        statements.to_sql_text()
    )
}

/// Keep the answer lines that are complete INSERT statements.
pub fn parse_insert_statements(answer: &str) -> StatementSet {
    answer
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("INSERT INTO") && line.ends_with(';'))
        .filter_map(GeneratedStatement::from_sql)
        .collect()
}
