//! Typed filters and filter schemas for the application's list views.
//!
//! Each feature module exposes its committed filter type, a shared
//! `FilterSchema`, the REST resource it lists and the config table name.

pub mod membership;
pub mod referral;
pub mod users;
pub mod wallet_settings;

use chrono::NaiveDate;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Inclusive date range picked in a date-range input.
///
/// Serializes as UTC timestamps covering whole days, so `to` includes the
/// entire end date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

impl Serialize for DateRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let from = self
            .from
            .and_then(|d| d.and_hms_milli_opt(0, 0, 0, 0))
            .map(|t| t.and_utc().to_rfc3339_opts(chrono::SecondsFormat::Millis, true));
        let to = self
            .to
            .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
            .map(|t| t.and_utc().to_rfc3339_opts(chrono::SecondsFormat::Millis, true));
        let mut state = serializer.serialize_struct("DateRange", 2)?;
        state.serialize_field("from", &from)?;
        state.serialize_field("to", &to)?;
        state.end()
    }
}

/// Amount bounds as typed into min/max text inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AmountRange {
    pub min: Option<String>,
    pub max: Option<String>,
}

impl AmountRange {
    pub fn new(min: Option<&str>, max: Option<&str>) -> Self {
        Self {
            min: min.map(str::to_string),
            max: max.map(str::to_string),
        }
    }
}

/// Skip condition: blank strings contribute nothing.
pub(crate) fn non_blank(value: &Value) -> bool {
    !matches!(value, Value::String(s) if s.trim().is_empty())
}
