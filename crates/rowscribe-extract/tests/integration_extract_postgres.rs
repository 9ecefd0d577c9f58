use std::{env, fs};

use anyhow::{Context, Result};
use rowscribe_core::{Error, SqlValue, TableRef};
use rowscribe_extract::{Filter, PostgresExtractor, TableExtractor};
use sqlx::{PgPool, postgres::PgPoolOptions};

const FIXTURE_PATHS: &[&str] = &[
    concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures/sql/postgres/001_schema.sql"),
    concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures/sql/postgres/002_data.sql"),
];

fn database_url() -> Option<String> {
    env::var("TEST_DATABASE_URL").ok()
}

async fn run_fixture(pool: &PgPool, path: &str) -> Result<()> {
    let script = fs::read_to_string(path).with_context(|| format!("reading fixture {path}"))?;

    for statement in script.split(';') {
        let sql = statement.trim();
        if sql.is_empty() {
            continue;
        }

        sqlx::query(sql)
            .execute(pool)
            .await
            .with_context(|| format!("executing fixture {path}"))?;
    }

    Ok(())
}

async fn connect() -> Result<Option<PgPool>> {
    let Some(db_url) = database_url() else {
        return Ok(None);
    };
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(&db_url)
        .await
        .context("connecting to Postgres")?;
    for path in FIXTURE_PATHS {
        run_fixture(&pool, path).await?;
    }
    Ok(Some(pool))
}

// Both scenarios share one test so the fixture reset cannot race another test.
#[tokio::test]
async fn extracts_filtered_rows_in_declared_column_order() -> Result<()> {
    let Some(pool) = connect().await? else {
        return Ok(());
    };
    let extractor = PostgresExtractor::new(pool);
    let table = TableRef::new("kmznmst", "tb_cdrsend_base_info");

    let extraction = extractor
        .extract(&table, &Filter::raw("wflow_inst_id LIKE '%HBDACM00'"))
        .await?;

    let names: Vec<&str> = extraction
        .columns
        .iter()
        .map(|column| column.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "ne_id",
            "wflow_inst_id",
            "origin_fmt_id",
            "cdr_change_fmt_id",
            "send_cycle",
            "send_path",
            "eff_dt",
            "exp_dt"
        ]
    );
    assert_eq!(extraction.row_count(), 3);
    let first = &extraction.rows[0];
    assert_eq!(first.get("ne_id"), Some(&SqlValue::Text("NE001".to_string())));
    assert!(matches!(first.get("send_cycle"), Some(SqlValue::Numeric(_))));
    assert!(matches!(first.get("eff_dt"), Some(SqlValue::Timestamp(_))));

    let bound = extractor
        .extract(
            &TableRef::new("kmznmst", "tb_cdrcoll_srvr_info"),
            &Filter::bound("srvr_id = $1 AND exp_dt > now()", vec!["NE001".to_string()]),
        )
        .await?;
    assert_eq!(bound.row_count(), 1);
    assert_eq!(bound.rows[0].get("use_yn"), Some(&SqlValue::Bool(true)));

    let missing = extractor
        .extract(&TableRef::new("kmznmst", "no_such_table"), &Filter::all())
        .await;
    assert!(matches!(missing, Err(Error::TableNotFound(_))));

    let bad_clause = extractor
        .extract(&table, &Filter::raw("no_such_column = 1"))
        .await;
    assert!(matches!(bad_clause, Err(Error::Query(_))));

    Ok(())
}
