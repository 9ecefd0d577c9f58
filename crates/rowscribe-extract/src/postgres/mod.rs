use std::future::Future;
use std::time::Instant;

use sqlx::PgPool;
use tracing::{debug, info};

use rowscribe_core::{ColumnDescriptor, Error, Result, TableRef};

use crate::extractor::{Extraction, Filter, TableExtractor};
use crate::options::ExtractOptions;
use crate::sql::build_select;

mod mapper;
mod queries;

/// Extractor backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PostgresExtractor {
    pool: PgPool,
    options: ExtractOptions,
}

impl PostgresExtractor {
    /// Create a new extractor using a pre-configured pool.
    pub fn new(pool: PgPool) -> Self {
        Self::with_options(pool, ExtractOptions::default())
    }

    pub fn with_options(pool: PgPool, options: ExtractOptions) -> Self {
        Self { pool, options }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn bounded<T>(&self, what: &str, future: impl Future<Output = Result<T>>) -> Result<T> {
        match self.options.query_timeout {
            Some(limit) => tokio::time::timeout(limit, future).await.map_err(|_| {
                Error::Query(format!("{what} exceeded {} ms", limit.as_millis()))
            })?,
            None => future.await,
        }
    }
}

#[async_trait::async_trait]
impl TableExtractor for PostgresExtractor {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn columns(&self, table: &TableRef) -> Result<Vec<ColumnDescriptor>> {
        let raw = self
            .bounded("column lookup", queries::list_columns(&self.pool, table))
            .await?;
        if raw.is_empty() {
            return Err(Error::TableNotFound(table.qualified()));
        }
        Ok(mapper::map_columns(raw))
    }

    async fn extract(&self, table: &TableRef, filter: &Filter) -> Result<Extraction> {
        let start = Instant::now();
        let columns = self.columns(table).await?;

        let limit = self.options.max_rows.map(|max| max + 1);
        let sql = build_select(table, &columns, filter, limit);
        debug!(table = %table, params = filter.params.len(), sql = %sql, "running extraction");

        let cells = self
            .bounded(
                "extraction",
                queries::fetch_text_rows(&self.pool, &sql, &filter.params),
            )
            .await?;

        if let Some(max) = self.options.max_rows {
            if cells.len() > max {
                return Err(Error::Query(format!(
                    "{table}: more than {max} rows match the filter"
                )));
            }
        }

        let rows = cells
            .into_iter()
            .map(|cells| mapper::map_row(table, &columns, cells))
            .collect::<Result<Vec<_>>>()?;

        info!(
            table = %table,
            rows = rows.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "table extracted"
        );
        Ok(Extraction { columns, rows })
    }
}
