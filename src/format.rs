//! Row formatting
//!
//! Rewrites timestamp-typed values into the canonical `YYYY-MM-DD HH:MM:SS`
//! text and passes everything else through untouched.

use crate::types::{FormattedRow, Row, Value};
use chrono::NaiveDateTime;

/// Canonical textual pattern for timestamps in exported artifacts
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a timestamp with [`TIMESTAMP_FORMAT`]
///
/// Sub-second precision is dropped. No timezone conversion is applied.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Normalize a single value
pub fn format_value(value: Value) -> Value {
    match value {
        Value::Timestamp(ts) => Value::Text(format_timestamp(&ts)),
        other => other,
    }
}

/// Normalize one row, preserving arity and order
pub fn format_row(row: Row) -> FormattedRow {
    FormattedRow(row.into_iter().map(format_value).collect())
}

/// Normalize every row, preserving row order
pub fn format_rows(rows: Vec<Row>) -> Vec<FormattedRow> {
    rows.into_iter().map(format_row).collect()
}
