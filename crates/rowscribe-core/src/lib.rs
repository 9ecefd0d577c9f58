//! Core contracts shared by the rowscribe crates.
//!
//! Defines the table/column model, typed SQL values, column rules, generated
//! statements, migration results, task records, and the error taxonomy used
//! by the extraction, generation, migration, and recommendation crates.

pub mod error;
pub mod ident;
pub mod migration;
pub mod redaction;
pub mod rule;
pub mod statement;
pub mod table;
pub mod task;
pub mod value;

pub use error::{Error, Result};
pub use ident::{display_ident, quote_ident};
pub use migration::{
    MigrationPreview, MigrationRequest, MigrationResult, MigrationState, TableOutcome,
    TablePreview,
};
pub use redaction::{RedactedUrl, redact_url};
pub use rule::{ColumnRule, ColumnRules};
pub use statement::{GeneratedStatement, StatementSet};
pub use table::{ColumnDescriptor, ColumnValue, ExtractedRow, TableRef, TypeFamily};
pub use task::{Recommendation, TaskRecord};
pub use value::SqlValue;
