//! NE-ID migration: fixed-table extraction, identifier conversion through an
//! external service, and fallback to the original statements.

pub mod converter;
pub mod events;
pub mod orchestrator;
pub mod tables;

pub use converter::{
    ChatServiceConfig, ChatServiceConverter, Conversion, IdentifierConverter, Verification,
    conversion_prompt, parse_insert_statements, verification_input,
};
pub use events::{EventSender, MigrationEvent};
pub use orchestrator::{MigrationOptions, MigrationOrchestrator};
pub use tables::{MIGRATION_SCHEMA, MigrationTable};
