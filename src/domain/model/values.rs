//! Column typing, value coercion and timestamp helpers shared by the CRUD core,
//! table hooks and agent tools.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Bool,
    Json,
    Timestamp,
    Date,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Text | ColumnType::Json | ColumnType::Timestamp | ColumnType::Date => {
                "TEXT"
            }
            ColumnType::Integer | ColumnType::Bool => "INTEGER",
            ColumnType::Real => "REAL",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Real => "real",
            ColumnType::Bool => "bool",
            ColumnType::Json => "json",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Date => "date",
        }
    }
}

/// Plain SQL identifier: ASCII letter or underscore, then alphanumerics/underscores.
pub fn validate_ident(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Coerces an incoming JSON value into the scalar stored for `column_type`.
///
/// Strings are accepted for numeric and boolean columns so that query-string
/// filters and loosely typed model output (`"3"`, `"true"`) land correctly.
/// `null` passes through for every type; NOT NULL is enforced by the table.
pub fn coerce_for_column(column_type: ColumnType, v: &JsonValue) -> Result<JsonValue, String> {
    if v.is_null() {
        return Ok(JsonValue::Null);
    }
    match column_type {
        ColumnType::Integer => {
            if let Some(n) = v.as_i64() {
                return Ok(JsonValue::from(n));
            }
            if let Some(f) = v.as_f64() {
                if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    return Ok(JsonValue::from(f as i64));
                }
                return Err("expected integer".to_string());
            }
            if let Some(s) = v.as_str() {
                let parsed = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| "expected integer".to_string())?;
                return Ok(JsonValue::from(parsed));
            }
            Err("expected integer".to_string())
        }
        ColumnType::Real => {
            if let Some(f) = v.as_f64() {
                return Ok(JsonValue::from(f));
            }
            if let Some(s) = v.as_str() {
                let parsed = s
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| "expected number".to_string())?;
                if !parsed.is_finite() {
                    return Err("expected finite number".to_string());
                }
                return Ok(JsonValue::from(parsed));
            }
            Err("expected number".to_string())
        }
        ColumnType::Bool => {
            if let Some(b) = v.as_bool() {
                return Ok(JsonValue::from(i64::from(b)));
            }
            if let Some(n) = v.as_i64() {
                return match n {
                    0 | 1 => Ok(JsonValue::from(n)),
                    _ => Err("expected bool".to_string()),
                };
            }
            if let Some(s) = v.as_str() {
                let lc = s.trim().to_lowercase();
                return match lc.as_str() {
                    "true" | "t" | "1" | "yes" => Ok(JsonValue::from(1)),
                    "false" | "f" | "0" | "no" => Ok(JsonValue::from(0)),
                    _ => Err("expected bool".to_string()),
                };
            }
            Err("expected bool".to_string())
        }
        ColumnType::Timestamp => {
            let s = v
                .as_str()
                .ok_or_else(|| "expected timestamp string".to_string())?;
            // Stored normalised so that text comparison orders chronologically.
            parse_timestamp(s)
                .map(|dt| JsonValue::from(format_timestamp(dt)))
                .ok_or_else(|| "expected RFC3339 timestamp".to_string())
        }
        ColumnType::Date => {
            let s = v.as_str().ok_or_else(|| "expected date string".to_string())?;
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|_| "expected YYYY-MM-DD date".to_string())?;
            Ok(JsonValue::from(s.trim()))
        }
        // Stored as serialized text so decoding restores the exact value.
        ColumnType::Json => Ok(JsonValue::from(v.to_string())),
        ColumnType::Text => {
            if let Some(s) = v.as_str() {
                return Ok(JsonValue::from(s));
            }
            // allow numbers/bools to stringify for text columns
            Ok(JsonValue::from(v.to_string()))
        }
    }
}

/// Accepts RFC 3339 as well as naive `YYYY-MM-DD[T ]HH:MM[:SS]` (read as UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

static LAST_STAMP_MICROS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Current time in the canonical stored form (UTC, microseconds, `Z` suffix).
///
/// The fixed width makes lexicographic order match chronological order.
/// Successive calls in one process never repeat a value, so `created_at`
/// follows insertion order.
pub fn now_timestamp() -> String {
    let now = Utc::now().timestamp_micros();
    let mut stamped = now;
    let _ = LAST_STAMP_MICROS.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
        stamped = now.max(last.saturating_add(1));
        Some(stamped)
    });
    format_timestamp(DateTime::from_timestamp_micros(stamped).unwrap_or_else(Utc::now))
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Next `updated_at` value, strictly later than `previous` even on a clock tie.
pub fn next_timestamp(previous: Option<&str>) -> String {
    let now = Utc::now();
    let Some(prev) = previous.and_then(parse_timestamp) else {
        return format_timestamp(now);
    };
    if now > prev {
        format_timestamp(now)
    } else {
        format_timestamp(prev + chrono::Duration::microseconds(1))
    }
}

/// `true` for null, empty strings and whitespace-only strings.
pub fn is_blank(v: &JsonValue) -> bool {
    match v {
        JsonValue::Null => true,
        JsonValue::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
