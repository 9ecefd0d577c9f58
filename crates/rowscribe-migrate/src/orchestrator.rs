use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{info, warn};

use rowscribe_core::{
    ColumnRules, Error, MigrationPreview, MigrationRequest, MigrationResult, MigrationState,
    Result, StatementSet, TableOutcome, TablePreview,
};
use rowscribe_extract::TableExtractor;
use rowscribe_generate::{RuleContext, StatementBuilder};

use crate::converter::IdentifierConverter;
use crate::events::{EventSender, MigrationEvent};
use crate::tables::{MIGRATION_SCHEMA, MigrationTable};

pub const DEFAULT_CONVERSION_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Clone)]
pub struct MigrationOptions {
    /// Schema of the fixed migration tables.
    pub schema: String,
    pub conversion_timeout: Duration,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            schema: MIGRATION_SCHEMA.to_string(),
            conversion_timeout: DEFAULT_CONVERSION_TIMEOUT,
        }
    }
}

/// Drives one NE-ID migration from extraction to the final statement set.
///
/// Without a converter the original statements are returned unconverted.
pub struct MigrationOrchestrator {
    extractor: Arc<dyn TableExtractor>,
    converter: Option<Arc<dyn IdentifierConverter>>,
    options: MigrationOptions,
    events: Option<EventSender>,
}

impl MigrationOrchestrator {
    pub fn new(extractor: Arc<dyn TableExtractor>) -> Self {
        Self {
            extractor,
            converter: None,
            options: MigrationOptions::default(),
            events: None,
        }
    }

    pub fn with_converter(mut self, converter: Arc<dyn IdentifierConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn with_options(mut self, options: MigrationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn options(&self) -> &MigrationOptions {
        &self.options
    }

    pub async fn migrate(&self, request: &MigrationRequest) -> Result<MigrationResult> {
        if let Err(err) = request.validate() {
            self.emit(MigrationEvent::State(MigrationState::Failed));
            return Err(err);
        }
        let source_id = request.source_id.trim();
        let target_id = request.target_id.trim();
        let started = Instant::now();
        self.emit(MigrationEvent::State(MigrationState::Pending));

        let ctx = RuleContext::now();
        let per_table = self.extract_all(source_id, &ctx).await;
        let mut result = MigrationResult {
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            per_table,
            original_count: 0,
            converted_statements: None,
            used_fallback: false,
            raw_response: None,
        };
        let original = result.original_statements();
        result.original_count = original.len();
        info!(
            source_id,
            target_id,
            tables_with_data = result.tables_with_data(),
            statements = result.original_count,
            duration_ms = started.elapsed().as_millis() as u64,
            "migration tables extracted"
        );

        if original.is_empty() {
            info!(source_id, "no rows for source NE id, conversion skipped");
        } else if let Some(converter) = &self.converter {
            self.emit(MigrationEvent::State(MigrationState::Converting));
            let attempt = tokio::time::timeout(
                self.options.conversion_timeout,
                converter.convert(&original, source_id, target_id),
            )
            .await
            .unwrap_or_else(|_| {
                Err(Error::ConversionFailed(format!(
                    "conversion timed out after {}s",
                    self.options.conversion_timeout.as_secs()
                )))
            });

            match attempt {
                Ok(conversion) => {
                    result.converted_statements = Some(conversion.statements);
                    result.raw_response = Some(conversion.raw_response);
                }
                Err(err) => {
                    let reason = err.to_string();
                    warn!(
                        converter = converter.name(),
                        source_id,
                        target_id,
                        reason = %reason,
                        "conversion failed, falling back to original statements"
                    );
                    self.emit(MigrationEvent::ConversionFallback { reason });
                    result.converted_statements = Some(original);
                    result.used_fallback = true;
                }
            }
        }

        self.emit(MigrationEvent::State(MigrationState::Done));
        info!(
            source_id,
            target_id,
            statements = result.final_statements().len(),
            used_fallback = result.used_fallback,
            duration_ms = started.elapsed().as_millis() as u64,
            "migration completed"
        );
        Ok(result)
    }

    /// Row counts per migration table, without rendering or conversion.
    pub async fn preview(&self, source_id: &str) -> Result<MigrationPreview> {
        let source_id = source_id.trim();
        if source_id.is_empty() {
            return Err(Error::Validation("source NE id is required".to_string()));
        }
        let schema = self.options.schema.as_str();
        let reads = MigrationTable::ALL.iter().map(|table| async move {
            let table_ref = table.table_ref(schema);
            let filter = table.filter(schema, source_id);
            (*table, self.extractor.extract(&table_ref, &filter).await)
        });

        let tables: Vec<TablePreview> = join_all(reads)
            .await
            .into_iter()
            .map(|(table, outcome)| match outcome {
                Ok(extraction) => TablePreview {
                    table: table.name().to_string(),
                    rows: extraction.row_count(),
                    error: None,
                },
                Err(err) => TablePreview {
                    table: table.name().to_string(),
                    rows: 0,
                    error: Some(err.to_string()),
                },
            })
            .collect();
        let total_rows = tables.iter().map(|table| table.rows).sum();
        info!(source_id, total_rows, "migration preview completed");

        Ok(MigrationPreview {
            source_id: source_id.to_string(),
            tables,
            total_rows,
        })
    }

    async fn extract_all(&self, source_id: &str, ctx: &RuleContext) -> Vec<TableOutcome> {
        let schema = self.options.schema.as_str();
        let reads = MigrationTable::ALL
            .iter()
            .map(|table| self.extract_table(*table, schema, source_id, ctx));
        join_all(reads).await
    }

    /// Reads and renders one table, reporting its outcome as soon as it resolves.
    async fn extract_table(
        &self,
        table: MigrationTable,
        schema: &str,
        source_id: &str,
        ctx: &RuleContext,
    ) -> TableOutcome {
        let name = table.name().to_string();
        self.emit(MigrationEvent::State(MigrationState::Extracting(name.clone())));

        let table_ref = table.table_ref(schema);
        let filter = table.filter(schema, source_id);
        let rendered = self
            .extractor
            .extract(&table_ref, &filter)
            .await
            .and_then(|extraction| {
                let rules = ColumnRules::new();
                StatementBuilder::new(&table_ref, &extraction.columns, &rules, *ctx)
                    .build_all(&extraction.rows)
            });

        match rendered {
            Ok(statements) => {
                self.emit(MigrationEvent::TableExtracted {
                    table: name.clone(),
                    rows: statements.len(),
                });
                TableOutcome {
                    table: name,
                    statements,
                    error: None,
                }
            }
            Err(err) => {
                warn!(schema, table = %name, error = %err, "migration table failed");
                self.emit(MigrationEvent::TableFailed {
                    table: name.clone(),
                    error: err.to_string(),
                });
                TableOutcome {
                    table: name,
                    statements: StatementSet::new(),
                    error: Some(err.to_string()),
                }
            }
        }
    }

    fn emit(&self, event: MigrationEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}
