use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use fractic_server_error::ServerError;

use crate::errors::InvalidIsoDate;

/// Calendar day. Accepts `YYYY-MM-DD` optionally followed by a time part
/// (`2025-04-27T23:30:00-05:00`, `2025-04-27 10:00:00`); the time and offset
/// are ignored rather than converted, so the day never shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IsoDateModel(NaiveDate);

impl FromStr for IsoDateModel {
    type Err = ServerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let day_part = match trimmed.get(..10) {
            Some(day) if trimmed.len() == 10 || is_time_separator(trimmed.as_bytes()[10]) => day,
            _ => return Err(InvalidIsoDate::new(s)),
        };
        let d = NaiveDate::parse_from_str(day_part, "%Y-%m-%d")
            .map_err(|e| InvalidIsoDate::with_debug(s, &e))?;
        Ok(IsoDateModel(d))
    }
}

fn is_time_separator(b: u8) -> bool {
    b == b'T' || b == b't' || b == b' '
}

impl From<IsoDateModel> for NaiveDate {
    fn from(model: IsoDateModel) -> NaiveDate {
        model.0
    }
}

/// Point in time. RFC 3339 is taken as-is; naive timestamps and bare days are
/// read as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IsoTimestampModel(DateTime<Utc>);

impl FromStr for IsoTimestampModel {
    type Err = ServerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(IsoTimestampModel(dt.with_timezone(&Utc)));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
            return Ok(IsoTimestampModel(naive.and_utc()));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
            return Ok(IsoTimestampModel(naive.and_utc()));
        }
        let day: NaiveDate = IsoDateModel::from_str(trimmed)?.into();
        Ok(IsoTimestampModel(day.and_time(NaiveTime::MIN).and_utc()))
    }
}

impl From<IsoTimestampModel> for DateTime<Utc> {
    fn from(model: IsoTimestampModel) -> DateTime<Utc> {
        model.0
    }
}

/// Canonical day string used for every date comparison and for the cache.
pub(crate) fn format_day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
