//! Raw `/query` payload → ordered `PriceRecord`s.
//!
//! The payload is loosely typed: one "Time Series" key maps date strings to
//! objects whose labels carry a numeric prefix (`"1. open"`). Only the text
//! after the first `". "` is meaningful. Any malformed entry fails the whole
//! call; there is no best-effort output.

use crate::models::{PriceRecord, RawSeriesResponse};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use thiserror::Error;

pub const SERIES_KEY_MARKER: &str = "Time Series";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    #[error("no \"Time Series\" key in response")]
    MissingSeriesKey,

    #[error("malformed date {0:?}")]
    MalformedDate(String),

    #[error("missing field {0:?}")]
    MissingField(String),

    #[error("malformed value for {0}: {1:?}")]
    MalformedValue(String, String),

    #[error("malformed series: {0}")]
    MalformedSeries(String),
}

/// Name of the first top-level key containing "Time Series", if any.
pub fn find_series_key(raw: &RawSeriesResponse) -> Option<&str> {
    raw.keys()
        .map(String::as_str)
        .find(|k| k.contains(SERIES_KEY_MARKER))
}

/// `"1. open"` → `"open"`. Labels without the delimiter are returned whole.
pub fn semantic_name(label: &str) -> &str {
    label.split_once(". ").map_or(label, |(_, name)| name)
}

pub fn transform(raw: &RawSeriesResponse) -> Result<Vec<PriceRecord>, TransformError> {
    let key = find_series_key(raw).ok_or(TransformError::MissingSeriesKey)?;
    let series = raw[key]
        .as_object()
        .ok_or_else(|| TransformError::MalformedSeries(format!("{key:?} is not an object")))?;

    let mut records = Vec::with_capacity(series.len());
    for (date_str, fields) in series {
        let date = NaiveDate::parse_from_str(date_str.trim(), DATE_FORMAT)
            .map_err(|_| TransformError::MalformedDate(date_str.clone()))?;

        let fields = fields.as_object().ok_or_else(|| {
            TransformError::MalformedSeries(format!("entry for {date_str} is not an object"))
        })?;

        records.push(PriceRecord {
            date,
            open: parse_price(fields, "open")?,
            high: parse_price(fields, "high")?,
            low: parse_price(fields, "low")?,
            close: parse_price(fields, "close")?,
            volume: parse_volume(fields)?,
        });
    }

    records.sort_by_key(|r| r.date);
    Ok(records)
}

// ── Field parsing ─────────────────────────────────────────────────────────────

fn lookup<'a>(fields: &'a Map<String, Value>, name: &str) -> Result<&'a Value, TransformError> {
    fields
        .iter()
        .find(|(label, _)| semantic_name(label) == name)
        .map(|(_, v)| v)
        .ok_or_else(|| TransformError::MissingField(name.to_string()))
}

/// The API sends numbers as strings; plain JSON numbers are accepted too.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_price(fields: &Map<String, Value>, name: &str) -> Result<f64, TransformError> {
    let value = lookup(fields, name)?;
    value_text(value)
        .and_then(|t| t.parse::<f64>().ok())
        .filter(|p| p.is_finite() && *p >= 0.0)
        .ok_or_else(|| TransformError::MalformedValue(name.to_string(), raw_text(value)))
}

fn parse_volume(fields: &Map<String, Value>) -> Result<i64, TransformError> {
    let value = lookup(fields, "volume")?;
    value_text(value)
        .and_then(|t| t.parse::<i64>().ok())
        .filter(|v| *v >= 0)
        .ok_or_else(|| TransformError::MalformedValue("volume".to_string(), raw_text(value)))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
