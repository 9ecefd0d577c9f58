use chrono::{TimeZone, Utc};

use rowscribe_core::{ColumnDescriptor, ColumnRule, ColumnRules, Error, SqlValue, TableRef};
use rowscribe_extract::{Filter, MemoryExtractor};
use rowscribe_generate::{RuleContext, generate_custom, generate_custom_at};

fn send_base_table() -> TableRef {
    TableRef::new("kmznmst", "tb_cdrsend_base_info")
}

fn send_base_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("ne_id", "varchar"),
        ColumnDescriptor::new("wflow_inst_id", "varchar"),
        ColumnDescriptor::new("send_cycle", "numeric"),
        ColumnDescriptor::new("send_path", "varchar"),
        ColumnDescriptor::new("eff_dt", "timestamp"),
    ]
}

fn text(value: &str) -> SqlValue {
    SqlValue::Text(value.to_string())
}

fn extractor() -> MemoryExtractor {
    let eff_dt = SqlValue::parse(rowscribe_core::TypeFamily::Timestamp, "2024-01-01 00:00:00")
        .expect("timestamp fixture");
    MemoryExtractor::new().with_table(
        send_base_table(),
        send_base_columns(),
        vec![
            vec![
                text("NE001"),
                text("C2024HBDACM00"),
                SqlValue::Numeric("5".to_string()),
                text("/data/send/c"),
                eff_dt.clone(),
            ],
            vec![
                text("NE001"),
                text("P2024HBDACM00"),
                SqlValue::Numeric("10".to_string()),
                text("/data/o'brien"),
                eff_dt.clone(),
            ],
            vec![
                text("NE001"),
                text("X2024HBDACM00"),
                SqlValue::Null,
                text("/data/send/x"),
                eff_dt,
            ],
        ],
    )
}

#[tokio::test]
async fn default_rules_yield_one_statement_per_row() {
    let extractor = extractor();
    let statements = generate_custom(
        &extractor,
        &send_base_table(),
        Some("wflow_inst_id LIKE '%HBDACM00'"),
        &ColumnRules::new(),
    )
    .await
    .expect("generation succeeds");

    assert_eq!(statements.len(), 3);
    assert_eq!(statements.tables(), vec!["kmznmst.tb_cdrsend_base_info"]);
    assert_eq!(
        statements.as_slice()[1].sql,
        "INSERT INTO kmznmst.tb_cdrsend_base_info (ne_id, wflow_inst_id, send_cycle, send_path, eff_dt) \
         VALUES ('NE001', 'P2024HBDACM00', 10, '/data/o''brien', '2024-01-01 00:00:00');"
    );
    assert!(statements.as_slice()[2].sql.contains(", NULL, "));

    let calls = extractor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, Filter::raw("wflow_inst_id LIKE '%HBDACM00'"));
}

#[tokio::test]
async fn rules_rewrite_values_with_one_batch_instant() {
    let instant = Utc
        .with_ymd_and_hms(2025, 3, 4, 5, 6, 7)
        .single()
        .expect("valid instant");
    let rules = ColumnRules::new()
        .with(
            "ne_id",
            ColumnRule::ReplaceLiteral {
                old: "NE001".to_string(),
                new: "NE900".to_string(),
            },
        )
        .with("eff_dt", ColumnRule::CurrentTimestamp)
        .with(
            "send_cycle",
            ColumnRule::UserSupplied {
                value: "15".to_string(),
            },
        );

    let statements = generate_custom_at(
        &extractor(),
        &send_base_table(),
        None,
        &rules,
        RuleContext::at(instant),
    )
    .await
    .expect("generation succeeds");

    assert_eq!(statements.len(), 3);
    for statement in &statements {
        assert!(statement.sql.starts_with(
            "INSERT INTO kmznmst.tb_cdrsend_base_info (ne_id, wflow_inst_id, send_cycle, send_path, eff_dt) VALUES ('NE900', "
        ));
        assert!(
            statement
                .sql
                .ends_with(", '2025-03-04 05:06:07.000000');"),
            "{}",
            statement.sql
        );
        assert!(statement.sql.contains("', 15, '"));
    }
}

#[tokio::test]
async fn invalid_rules_fail_before_extraction() {
    let extractor = extractor();

    let unknown = ColumnRules::new().with("no_such_column", ColumnRule::CurrentTimestamp);
    let err = generate_custom(&extractor, &send_base_table(), None, &unknown)
        .await
        .expect_err("unknown column");
    assert!(matches!(err, Error::Validation(_)));

    let empty_old = ColumnRules::new().with(
        "ne_id",
        ColumnRule::ReplaceLiteral {
            old: String::new(),
            new: "NE900".to_string(),
        },
    );
    let err = generate_custom(&extractor, &send_base_table(), None, &empty_old)
        .await
        .expect_err("empty replace pattern");
    assert!(matches!(err, Error::Validation(_)));

    let bad_value = ColumnRules::new().with(
        "send_cycle",
        ColumnRule::UserSupplied {
            value: "weekly".to_string(),
        },
    );
    let err = generate_custom(&extractor, &send_base_table(), None, &bad_value)
        .await
        .expect_err("uncoercible value");
    assert!(matches!(err, Error::InvalidColumnValue { .. }));

    assert!(extractor.calls().is_empty());
}

#[tokio::test]
async fn unknown_table_is_reported() {
    let err = generate_custom(
        &extractor(),
        &TableRef::new("kmznmst", "tb_missing"),
        None,
        &ColumnRules::new(),
    )
    .await
    .expect_err("table is not registered");
    assert!(matches!(err, Error::TableNotFound(name) if name == "kmznmst.tb_missing"));
}
