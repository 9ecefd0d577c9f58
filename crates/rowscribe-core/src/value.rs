use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::table::TypeFamily;

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
const TIMESTAMPTZ_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Typed raw value as read from the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    /// Exact decimal text; never routed through floating point.
    Numeric(String),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(String),
    Uuid(String),
    /// Postgres hex form (`\x0a0b`).
    Bytes(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Parse the textual form of a value strictly as the given type family.
    pub fn parse(family: TypeFamily, text: &str) -> Result<SqlValue, String> {
        match family {
            TypeFamily::Integer => text
                .trim()
                .parse::<i64>()
                .map(SqlValue::Int)
                .map_err(|err| format!("not an integer: {err}")),
            TypeFamily::Numeric => {
                let trimmed = text.trim();
                if is_decimal(trimmed) {
                    Ok(SqlValue::Numeric(trimmed.to_string()))
                } else {
                    Err("not a decimal number".to_string())
                }
            }
            TypeFamily::Float => parse_float(text.trim()).map(SqlValue::Float),
            TypeFamily::Boolean => parse_bool(text.trim()).map(SqlValue::Bool),
            TypeFamily::Text | TypeFamily::Other => Ok(SqlValue::Text(text.to_string())),
            TypeFamily::Date => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                .map(SqlValue::Date)
                .map_err(|err| format!("not a date: {err}")),
            TypeFamily::Time => parse_with(text.trim(), TIME_FORMATS, NaiveTime::parse_from_str)
                .map(SqlValue::Time)
                .ok_or_else(|| "not a time of day".to_string()),
            TypeFamily::Timestamp => parse_timestamp(text.trim())
                .map(SqlValue::Timestamp)
                .ok_or_else(|| "not a timestamp".to_string()),
            TypeFamily::TimestampTz => parse_timestamptz(text.trim())
                .map(SqlValue::TimestampTz)
                .ok_or_else(|| "not a timestamp with time zone".to_string()),
            TypeFamily::Json => serde_json::from_str::<serde_json::Value>(text)
                .map(|_| SqlValue::Json(text.to_string()))
                .map_err(|err| format!("not valid json: {err}")),
            TypeFamily::Uuid => uuid::Uuid::parse_str(text.trim())
                .map(|id| SqlValue::Uuid(id.hyphenated().to_string()))
                .map_err(|err| format!("not a uuid: {err}")),
            TypeFamily::Bytes => {
                let trimmed = text.trim();
                let hex = trimmed.strip_prefix("\\x").unwrap_or_default();
                if trimmed.starts_with("\\x")
                    && hex.len() % 2 == 0
                    && hex.chars().all(|ch| ch.is_ascii_hexdigit())
                {
                    Ok(SqlValue::Bytes(trimmed.to_string()))
                } else {
                    Err("not a hex bytea value".to_string())
                }
            }
        }
    }

    /// Parse database text, degrading to `Text` when the family parse fails.
    pub fn from_db_text(family: TypeFamily, text: Option<&str>) -> SqlValue {
        match text {
            None => SqlValue::Null,
            Some(text) => {
                SqlValue::parse(family, text).unwrap_or_else(|_| SqlValue::Text(text.to_string()))
            }
        }
    }

    /// Textual form without SQL quoting; `None` for NULL.
    pub fn to_text(&self) -> Option<String> {
        let text = match self {
            SqlValue::Null => return None,
            SqlValue::Bool(value) => value.to_string(),
            SqlValue::Int(value) => value.to_string(),
            SqlValue::Float(value) => format_float(*value),
            SqlValue::Numeric(value)
            | SqlValue::Text(value)
            | SqlValue::Json(value)
            | SqlValue::Uuid(value)
            | SqlValue::Bytes(value) => value.clone(),
            SqlValue::Date(value) => value.format("%Y-%m-%d").to_string(),
            SqlValue::Time(value) => value.format("%H:%M:%S%.f").to_string(),
            SqlValue::Timestamp(value) => value.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            SqlValue::TimestampTz(value) => {
                value.format("%Y-%m-%d %H:%M:%S%.f+00:00").to_string()
            }
        };
        Some(text)
    }
}

/// Float text in the spelling Postgres accepts for special values.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() && value > 0.0 {
        "Infinity".to_string()
    } else if value.is_infinite() {
        "-Infinity".to_string()
    } else {
        value.to_string()
    }
}

fn parse_float(text: &str) -> Result<f64, String> {
    match text.to_lowercase().as_str() {
        "nan" => Ok(f64::NAN),
        "infinity" | "+infinity" | "inf" => Ok(f64::INFINITY),
        "-infinity" | "-inf" => Ok(f64::NEG_INFINITY),
        _ => text
            .parse::<f64>()
            .map_err(|err| format!("not a floating point number: {err}")),
    }
}

fn parse_bool(text: &str) -> Result<bool, String> {
    match text.to_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" | "on" => Ok(true),
        "false" | "f" | "0" | "no" | "n" | "off" => Ok(false),
        _ => Err("not a boolean".to_string()),
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    parse_with(text, TIMESTAMP_FORMATS, NaiveDateTime::parse_from_str).or_else(|| {
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    })
}

fn parse_timestamptz(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .or_else(|| parse_with(
            text,
            TIMESTAMPTZ_FORMATS,
            DateTime::<FixedOffset>::parse_from_str,
        ))
        .map(|value| value.with_timezone(&Utc))
}

fn parse_with<T, E>(
    text: &str,
    formats: &[&str],
    parse: impl Fn(&str, &str) -> Result<T, E>,
) -> Option<T> {
    formats.iter().find_map(|format| parse(text, format).ok())
}

/// Accepts `[+-]digits[.digits][e[+-]digits]` and `NaN`, the forms a Postgres
/// numeric prints.
fn is_decimal(text: &str) -> bool {
    if text.eq_ignore_ascii_case("nan") {
        return true;
    }
    let unsigned = text
        .strip_prefix('-')
        .or_else(|| text.strip_prefix('+'))
        .unwrap_or(text);
    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(idx) => (&unsigned[..idx], Some(&unsigned[idx + 1..])),
        None => (unsigned, None),
    };
    let (whole, fraction) = match mantissa.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (mantissa, ""),
    };
    let digits = |part: &str| part.chars().all(|ch| ch.is_ascii_digit());
    let mantissa_ok =
        (!whole.is_empty() || !fraction.is_empty()) && digits(whole) && digits(fraction);
    let exponent_ok = exponent.is_none_or(|exp| {
        let exp = exp
            .strip_prefix('-')
            .or_else(|| exp.strip_prefix('+'))
            .unwrap_or(exp);
        !exp.is_empty() && digits(exp)
    });
    mantissa_ok && exponent_ok
}
