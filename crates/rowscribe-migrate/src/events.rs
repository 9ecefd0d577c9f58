use tokio::sync::mpsc;

use rowscribe_core::MigrationState;

/// Progress notifications emitted while a migration runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationEvent {
    State(MigrationState),
    TableExtracted { table: String, rows: usize },
    TableFailed { table: String, error: String },
    ConversionFallback { reason: String },
}

pub type EventSender = mpsc::UnboundedSender<MigrationEvent>;
