//! Month-granularity date handling for query results and cache files.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serializer};

/// Truncate a date to the first day of its month. Idempotent.
pub fn normalize(date: NaiveDate) -> NaiveDate {
    date.with_day(1).expect("day 1 is valid for every month")
}

/// Parse a date-like value as the analytical store or a cached CSV emits it:
/// `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` (with or without a trailing `UTC`),
/// RFC 3339 timestamps, or a bare `YYYY-MM`. The result is always the first
/// of the month.
pub fn parse_month(raw: &str) -> Result<NaiveDate> {
    let s = raw.trim().trim_end_matches(" UTC");
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(normalize(date));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(normalize(dt.date()));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(normalize(dt.date_naive()));
    }
    if s.len() == 7 {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
            return Ok(date);
        }
    }
    Err(anyhow!("unrecognised month value {s:?}"))
}

pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_month(&raw).map_err(serde::de::Error::custom)
}
