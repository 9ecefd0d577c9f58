use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use rowscribe_core::{Error, Result, TableRef};

#[derive(Debug, sqlx::FromRow)]
pub struct RawColumn {
    pub name: String,
    pub sql_type: String,
}

pub async fn list_columns(pool: &PgPool, table: &TableRef) -> Result<Vec<RawColumn>> {
    sqlx::query_as::<_, RawColumn>(
        r#"
        select
          column_name::text as name,
          udt_name::text as sql_type
        from information_schema.columns
        where table_schema = $1
          and table_name = $2
        order by ordinal_position
        "#,
    )
    .bind(&table.schema)
    .bind(&table.name)
    .fetch_all(pool)
    .await
    .map_err(|err| Error::Query(err.to_string()))
}

/// Run an extraction SELECT whose projection is all `text`.
pub async fn fetch_text_rows(
    pool: &PgPool,
    sql: &str,
    params: &[String],
) -> Result<Vec<Vec<Option<String>>>> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = query.bind(param);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .map_err(|err| Error::Query(err.to_string()))?;

    rows.iter().map(decode_text_row).collect()
}

fn decode_text_row(row: &PgRow) -> Result<Vec<Option<String>>> {
    (0..row.len())
        .map(|idx| {
            row.try_get::<Option<String>, _>(idx)
                .map_err(|err| Error::Query(format!("decoding column {idx}: {err}")))
        })
        .collect()
}
