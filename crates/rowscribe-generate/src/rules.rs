use chrono::{DateTime, Utc};

use rowscribe_core::{
    ColumnDescriptor, ColumnRule, ColumnRules, Error, Result, SqlValue, TypeFamily,
};
use rowscribe_core::value::format_float;

/// Per-batch state shared by every rule application of one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleContext {
    /// Instant emitted by `CurrentTimestamp`, fixed for the whole batch.
    pub generated_at: DateTime<Utc>,
}

impl RuleContext {
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(generated_at: DateTime<Utc>) -> Self {
        Self { generated_at }
    }
}

/// Render the SQL literal for one column of one row.
pub fn apply(
    descriptor: &ColumnDescriptor,
    raw: &SqlValue,
    rule: &ColumnRule,
    ctx: &RuleContext,
) -> Result<String> {
    match rule {
        ColumnRule::Default => Ok(render_value(raw)),
        // An empty search value is rejected by `ColumnRules::validate`.
        ColumnRule::ReplaceLiteral { old, .. } if old.is_empty() => Ok(render_value(raw)),
        ColumnRule::ReplaceLiteral { old, new } => {
            let Some(text) = raw.to_text() else {
                return Ok(render_value(raw));
            };
            render_replaced(descriptor, raw, &text.replace(old.as_str(), new))
        }
        ColumnRule::CurrentTimestamp => render_timestamp(descriptor, ctx),
        ColumnRule::UserSupplied { value } => render_supplied(descriptor, value),
    }
}

/// Type-appropriate literal for a value: numbers bare, booleans as keywords,
/// everything else single quoted.
pub fn render_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Bool(true) => "TRUE".to_string(),
        SqlValue::Bool(false) => "FALSE".to_string(),
        SqlValue::Int(value) => value.to_string(),
        SqlValue::Numeric(value) if value.eq_ignore_ascii_case("nan") => quote(value),
        SqlValue::Numeric(value) => value.clone(),
        SqlValue::Float(value) if value.is_finite() => format_float(*value),
        SqlValue::Float(value) => quote(&format_float(*value)),
        other => quote(&other.to_text().unwrap_or_default()),
    }
}

/// Check every non-default rule against its column before any row is read.
pub fn validate_rules(columns: &[ColumnDescriptor], rules: &ColumnRules) -> Result<()> {
    rules.validate(columns)?;
    let probe = RuleContext::now();
    for (name, rule) in rules.iter() {
        let Some(descriptor) = columns.iter().find(|column| column.name == name) else {
            continue;
        };
        match rule {
            ColumnRule::CurrentTimestamp => {
                render_timestamp(descriptor, &probe)?;
            }
            ColumnRule::UserSupplied { value } => {
                render_supplied(descriptor, value)?;
            }
            ColumnRule::Default | ColumnRule::ReplaceLiteral { .. } => {}
        }
    }
    Ok(())
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn coerce(descriptor: &ColumnDescriptor, text: &str) -> Result<SqlValue> {
    SqlValue::parse(descriptor.family(), text)
        .map_err(|reason| Error::invalid_value(&descriptor.name, text, reason))
}

fn render_supplied(descriptor: &ColumnDescriptor, value: &str) -> Result<String> {
    let family = descriptor.family();
    if value.trim().is_empty() && !matches!(family, TypeFamily::Text | TypeFamily::Other) {
        return Ok(render_value(&SqlValue::Null));
    }
    coerce(descriptor, value).map(|value| render_value(&value))
}

// A value that already degraded to text on extraction stays quoted text.
fn render_replaced(descriptor: &ColumnDescriptor, raw: &SqlValue, text: &str) -> Result<String> {
    match coerce(descriptor, text) {
        Ok(value) => Ok(render_value(&value)),
        Err(_) if matches!(raw, SqlValue::Text(_)) => Ok(quote(text)),
        Err(err) => Err(err),
    }
}

fn render_timestamp(descriptor: &ColumnDescriptor, ctx: &RuleContext) -> Result<String> {
    let instant = ctx.generated_at;
    let text = match descriptor.family() {
        TypeFamily::Timestamp | TypeFamily::Text | TypeFamily::Other => {
            instant.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
        }
        TypeFamily::TimestampTz => instant.format("%Y-%m-%d %H:%M:%S%.6f+00:00").to_string(),
        TypeFamily::Date => instant.format("%Y-%m-%d").to_string(),
        TypeFamily::Time => instant.format("%H:%M:%S%.6f").to_string(),
        family => {
            return Err(Error::invalid_value(
                &descriptor.name,
                "current timestamp",
                format!("column type '{}' ({family:?}) cannot hold a timestamp", descriptor.sql_type),
            ));
        }
    };
    Ok(quote(&text))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn column(name: &str, sql_type: &str) -> ColumnDescriptor {
        ColumnDescriptor::new(name, sql_type)
    }

    fn ctx() -> RuleContext {
        RuleContext::at(
            Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0)
                .single()
                .unwrap_or_default(),
        )
    }

    /// Read a rendered literal back as a value of the column's type.
    fn parse_literal(descriptor: &ColumnDescriptor, literal: &str) -> SqlValue {
        match literal {
            "NULL" => SqlValue::Null,
            "TRUE" => SqlValue::Bool(true),
            "FALSE" => SqlValue::Bool(false),
            quoted if quoted.starts_with('\'') && quoted.ends_with('\'') && quoted.len() >= 2 => {
                let inner = quoted[1..quoted.len() - 1].replace("''", "'");
                SqlValue::parse(descriptor.family(), &inner).expect("literal parses")
            }
            bare => SqlValue::parse(descriptor.family(), bare).expect("literal parses"),
        }
    }

    #[test]
    fn default_literals_round_trip() {
        let cases = vec![
            (column("send_path", "varchar"), SqlValue::Text("O'Brien's \"path\"".to_string())),
            (column("send_cycle", "numeric"), SqlValue::Numeric("-10.250".to_string())),
            (column("port_no", "int4"), SqlValue::Int(8080)),
            (column("ratio", "float8"), SqlValue::Float(0.125)),
            (column("use_yn", "bool"), SqlValue::Bool(false)),
            (column("memo", "text"), SqlValue::Null),
            (
                column("eff_dt", "timestamp"),
                SqlValue::parse(TypeFamily::Timestamp, "2024-01-01 00:00:00.123456")
                    .expect("timestamp"),
            ),
            (
                column("day", "date"),
                SqlValue::parse(TypeFamily::Date, "2024-02-29").expect("date"),
            ),
            (
                column("reg_dt", "timestamptz"),
                SqlValue::parse(TypeFamily::TimestampTz, "2024-03-01 10:11:12.5+09")
                    .expect("timestamptz"),
            ),
            (
                column("start_tm", "time"),
                SqlValue::parse(TypeFamily::Time, "23:59:58.250").expect("time"),
            ),
            (
                column("attrs", "jsonb"),
                SqlValue::parse(TypeFamily::Json, r#"{"owner": "O'Brien", "ports": [21, 22]}"#)
                    .expect("json"),
            ),
            (
                column("node_uid", "uuid"),
                SqlValue::parse(TypeFamily::Uuid, "6F9619FF-8B86-D011-B42D-00CF4FC964FF")
                    .expect("uuid"),
            ),
            (
                column("payload", "bytea"),
                SqlValue::parse(TypeFamily::Bytes, "\\x0a0bff").expect("bytes"),
            ),
        ];

        for (descriptor, raw) in cases {
            let literal = apply(&descriptor, &raw, &ColumnRule::Default, &ctx()).expect("renders");
            assert_eq!(parse_literal(&descriptor, &literal), raw, "{literal}");
        }
    }

    #[test]
    fn default_quotes_strings_and_leaves_numbers_bare() {
        let text = apply(
            &column("send_path", "varchar"),
            &SqlValue::Text("it's".to_string()),
            &ColumnRule::Default,
            &ctx(),
        )
        .expect("renders");
        assert_eq!(text, "'it''s'");

        let number = apply(
            &column("send_cycle", "numeric"),
            &SqlValue::Numeric("5".to_string()),
            &ColumnRule::Default,
            &ctx(),
        )
        .expect("renders");
        assert_eq!(number, "5");
        assert_eq!(render_value(&SqlValue::Float(f64::NAN)), "'NaN'");
    }

    #[test]
    fn replace_is_idempotent_when_new_does_not_reintroduce_old() {
        let descriptor = column("wflow_inst_id", "varchar");
        let rule = ColumnRule::ReplaceLiteral {
            old: "NE001".to_string(),
            new: "NE777".to_string(),
        };
        let raw = SqlValue::Text("C-NE001-NE001".to_string());

        let once = apply(&descriptor, &raw, &rule, &ctx()).expect("renders");
        assert_eq!(once, "'C-NE777-NE777'");

        let replaced = parse_literal(&descriptor, &once);
        let twice = apply(&descriptor, &replaced, &rule, &ctx()).expect("renders");
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_replace_pattern_renders_value_unchanged() {
        let rule = ColumnRule::ReplaceLiteral {
            old: String::new(),
            new: "X".to_string(),
        };
        let raw = SqlValue::Text("NE001".to_string());
        let literal = apply(&column("ne_id", "varchar"), &raw, &rule, &ctx()).expect("no-op");
        assert_eq!(literal, render_value(&raw));
    }

    #[test]
    fn replace_keeps_null_and_revalidates_numbers() {
        let rule = ColumnRule::ReplaceLiteral {
            old: "1".to_string(),
            new: "x".to_string(),
        };
        let null = apply(&column("memo", "text"), &SqlValue::Null, &rule, &ctx()).expect("null");
        assert_eq!(null, "NULL");

        let broken = apply(&column("port_no", "int4"), &SqlValue::Int(21), &rule, &ctx());
        assert!(matches!(broken, Err(Error::InvalidColumnValue { .. })));

        let numeric_ok = apply(
            &column("port_no", "int4"),
            &SqlValue::Int(21),
            &ColumnRule::ReplaceLiteral {
                old: "1".to_string(),
                new: "2".to_string(),
            },
            &ctx(),
        )
        .expect("still a number");
        assert_eq!(numeric_ok, "22");
    }

    #[test]
    fn current_timestamp_formats_per_type() {
        let rule = ColumnRule::CurrentTimestamp;
        let raw = SqlValue::Text("ignored".to_string());
        assert_eq!(
            apply(&column("eff_dt", "timestamp"), &raw, &rule, &ctx()).expect("ts"),
            "'2025-06-01 08:30:00.000000'"
        );
        assert_eq!(
            apply(&column("eff_dt", "timestamptz"), &raw, &rule, &ctx()).expect("tstz"),
            "'2025-06-01 08:30:00.000000+00:00'"
        );
        assert_eq!(
            apply(&column("day", "date"), &raw, &rule, &ctx()).expect("date"),
            "'2025-06-01'"
        );
        assert!(matches!(
            apply(&column("port_no", "int4"), &raw, &rule, &ctx()),
            Err(Error::InvalidColumnValue { .. })
        ));
    }

    #[test]
    fn user_supplied_values_are_coerced() {
        let numeric = apply(
            &column("send_cycle", "numeric"),
            &SqlValue::Null,
            &ColumnRule::UserSupplied {
                value: " 30 ".to_string(),
            },
            &ctx(),
        )
        .expect("numeric");
        assert_eq!(numeric, "30");

        let invalid = apply(
            &column("send_cycle", "numeric"),
            &SqlValue::Null,
            &ColumnRule::UserSupplied {
                value: "thirty".to_string(),
            },
            &ctx(),
        );
        assert!(matches!(invalid, Err(Error::InvalidColumnValue { .. })));

        let blank_number = apply(
            &column("send_cycle", "numeric"),
            &SqlValue::Int(1),
            &ColumnRule::UserSupplied {
                value: String::new(),
            },
            &ctx(),
        )
        .expect("blank renders null");
        assert_eq!(blank_number, "NULL");

        let text = apply(
            &column("send_path", "varchar"),
            &SqlValue::Null,
            &ColumnRule::UserSupplied {
                value: "/new/'path'".to_string(),
            },
            &ctx(),
        )
        .expect("text");
        assert_eq!(text, "'/new/''path'''");
    }

    #[test]
    fn validation_catches_bad_rules_up_front() {
        let columns = vec![column("port_no", "int4"), column("eff_dt", "timestamp")];
        let bad_value = ColumnRules::new().with(
            "port_no",
            ColumnRule::UserSupplied {
                value: "eighty".to_string(),
            },
        );
        assert!(matches!(
            validate_rules(&columns, &bad_value),
            Err(Error::InvalidColumnValue { .. })
        ));

        let bad_timestamp = ColumnRules::new().with("port_no", ColumnRule::CurrentTimestamp);
        assert!(validate_rules(&columns, &bad_timestamp).is_err());

        let good = ColumnRules::new().with("eff_dt", ColumnRule::CurrentTimestamp);
        assert!(validate_rules(&columns, &good).is_ok());
    }
}
