//! UTC date handling for export date ranges.
//!
//! Export requests carry calendar dates (`YYYY-MM-DD`). The range is
//! inclusive: the start date maps to 00:00:00 UTC and the end date to the
//! last representable instant of that day, so same-day exports pick up every
//! record stamped anywhere within the day.

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, Time};

use crate::error::CoreError;

const DATE_FORMAT: &[time::format_description::FormatItem<'_>] =
    format_description!("[year]-[month]-[day]");

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Result<Date, CoreError> {
    Date::parse(raw, DATE_FORMAT).map_err(|_| CoreError::invalid_date(raw))
}

/// First instant of the given day in UTC.
pub fn start_of_day_utc(date: Date) -> OffsetDateTime {
    date.with_time(Time::MIDNIGHT).assume_utc()
}

/// Last representable instant of the given day in UTC (23:59:59.999999999).
pub fn end_of_day_utc(date: Date) -> OffsetDateTime {
    date.with_time(Time::MAX).assume_utc()
}

/// Render a timestamp as RFC 3339 for wire payloads and CSV rows.
pub fn format_rfc3339(ts: OffsetDateTime) -> Result<String, CoreError> {
    Ok(ts.format(&Rfc3339)?)
}
