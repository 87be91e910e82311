//! Common types used throughout snapshot-export
//!
//! Scalar values as they come out of the source database and the row
//! shapes that flow between extraction, formatting and writing.

use base64::Engine as _;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use crate::error::ErrorKind;
use serde::Serialize;

// ============================================================================
// Scalar Values
// ============================================================================

/// A typed scalar extracted from the source database
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    /// Wall-clock timestamp, exactly as stored by the source
    Timestamp(NaiveDateTime),
    /// Calendar interval; a month counts as 30 days when rendered
    Interval { months: i32, days: i32, micros: i64 },
    Blob(Vec<u8>),
}

impl Value {
    /// Whether this value is timestamp-typed
    pub fn is_timestamp(&self) -> bool {
        matches!(self, Value::Timestamp(_))
    }

    /// Whether this value is SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render this value as the raw (unquoted) text of a CSV field
    pub fn to_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::UInt(u) => u.to_string(),
            Value::Float(f) => render_float(*f),
            Value::Text(s) => s.clone(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Time(t) => t.to_string(),
            // Timestamps are normally rewritten by the formatter before writing
            Value::Timestamp(ts) => ts.to_string(),
            Value::Interval {
                months,
                days,
                micros,
            } => render_interval(*months, *days, *micros),
            Value::Blob(b) => base64::engine::general_purpose::STANDARD.encode(b),
        }
    }
}

/// Integral floats keep a trailing `.0` so they stay distinguishable from ints
fn render_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

const MICROS_PER_DAY: i128 = 86_400_000_000;

/// `[N day[s], ]H:MM:SS[.ffffff]`, with a negative day count and a positive
/// clock part for negative intervals
fn render_interval(months: i32, days: i32, micros: i64) -> String {
    let whole_days = i128::from(months) * 30 + i128::from(days);
    let total = whole_days * MICROS_PER_DAY + i128::from(micros);
    let day_count = total.div_euclid(MICROS_PER_DAY);
    let clock = total.rem_euclid(MICROS_PER_DAY);

    let mut out = String::new();
    if day_count != 0 {
        let unit = if day_count.abs() == 1 { "day" } else { "days" };
        out.push_str(&format!("{day_count} {unit}, "));
    }
    out.push_str(&format!(
        "{}:{:02}:{:02}",
        clock / 3_600_000_000,
        clock / 60_000_000 % 60,
        clock / 1_000_000 % 60
    ));
    let fraction = clock % 1_000_000;
    if fraction != 0 {
        out.push_str(&format!(".{fraction:06}"));
    }
    out
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Value::Timestamp(ts)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ============================================================================
// Rows
// ============================================================================

/// One extracted record, positionally matching a table's source columns
pub type Row = Vec<Value>;

/// A row after date normalization; same arity and order as its [`Row`]
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedRow(pub Vec<Value>);

impl FormattedRow {
    /// Number of fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the row has no fields
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The field values
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Rendered text for every field
    pub fn fields(&self) -> Vec<String> {
        self.0.iter().map(Value::to_field).collect()
    }
}

// ============================================================================
// Run Reporting
// ============================================================================

/// Outcome of one table that reached `Done`
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    /// Source table name
    pub table: String,
    /// Number of data rows written (header excluded)
    pub rows: usize,
    /// Remote object key
    pub key: String,
    /// Fully-qualified remote location
    pub location: String,
    /// Wall time spent on this table
    pub elapsed_ms: u64,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Tables exported successfully, in processing order
    pub tables: Vec<TableReport>,
    /// Tables that failed (only populated under per-table isolation)
    pub failed: Vec<TableFailure>,
}

/// A table that failed under per-table isolation
#[derive(Debug, Clone, Serialize)]
pub struct TableFailure {
    /// Source table name
    pub table: String,
    /// Which stage of the cycle failed
    pub kind: ErrorKind,
    pub message: String,
}

impl RunReport {
    /// Total rows exported across all successful tables
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }
}
