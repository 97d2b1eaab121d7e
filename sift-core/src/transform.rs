//! Reusable value transforms for field mappings.
//!
//! Every transform returns its input unchanged when it cannot interpret it.

use crate::mapping::Transform;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};
use std::sync::Arc;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Date or RFC 3339 string to an RFC 3339 UTC timestamp.
pub fn iso_datetime() -> Transform {
    Arc::new(|value| map_str(value, |s| parse_instant(s).map(format_instant)))
}

/// Date (or timestamp) to the first instant of its UTC day.
pub fn start_of_day() -> Transform {
    Arc::new(|value| {
        map_str(value, |s| {
            parse_day(s)
                .and_then(|day| day.and_hms_milli_opt(0, 0, 0, 0))
                .map(|instant| format_instant(instant.and_utc()))
        })
    })
}

/// Date (or timestamp) to the last millisecond of its UTC day.
pub fn end_of_day() -> Transform {
    Arc::new(|value| {
        map_str(value, |s| {
            parse_day(s)
                .and_then(|day| day.and_hms_milli_opt(23, 59, 59, 999))
                .map(|instant| format_instant(instant.and_utc()))
        })
    })
}

/// Numeric string to a JSON number.
pub fn to_number() -> Transform {
    Arc::new(|value| match value {
        Value::String(s) => parse_number(s.trim()).unwrap_or_else(|| value.clone()),
        other => other.clone(),
    })
}

pub fn lowercase() -> Transform {
    Arc::new(|value| map_str(value, |s| Some(Value::String(s.to_lowercase()))))
}

pub fn uppercase() -> Transform {
    Arc::new(|value| map_str(value, |s| Some(Value::String(s.to_uppercase()))))
}

fn map_str<F>(value: &Value, f: F) -> Value
where
    F: Fn(&str) -> Option<Value>,
{
    match value {
        Value::String(s) => f(s.trim()).unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
        return Some(instant.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_day(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .or_else(|| parse_instant(s).map(|instant| instant.date_naive()))
}

fn format_instant(instant: DateTime<Utc>) -> Value {
    Value::String(instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn parse_number(s: &str) -> Option<Value> {
    if let Ok(int) = s.parse::<i64>() {
        return Some(Value::Number(int.into()));
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}
