//! Minute arithmetic on the `0..=1440` domain.
//!
//! `24:00` is accepted as a shift end marker and maps to `1440`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::BuildError;

/// Parses an `HH:MM` or `HH:MM:SS` string into minutes since midnight.
/// `"24:00"` and `"24:00:00"` map to `1440`. A `HH:MM:SS` seconds component
/// is truncated, not rounded — `"08:30:45"` is `510`, the same as `"08:30"`.
pub fn parse_hhmm(value: &str) -> Result<u16, BuildError> {
    let text = value.trim();
    if text == "24:00" || text == "24:00:00" {
        return Ok(1440);
    }
    if let Ok(parsed) = NaiveTime::parse_from_str(text, "%H:%M") {
        return validate_minutes((parsed.hour() * 60 + parsed.minute()) as i64);
    }
    if let Ok(parsed) = NaiveTime::parse_from_str(text, "%H:%M:%S") {
        return validate_minutes((parsed.hour() * 60 + parsed.minute()) as i64);
    }
    Err(BuildError::InvalidTimeExpression {
        value: value.to_string(),
    })
}

/// Clamps/validates minutes to the inclusive range `[0, 1440]`.
pub fn validate_minutes(minutes: i64) -> Result<u16, BuildError> {
    if !(0..=1440).contains(&minutes) {
        return Err(BuildError::MinutesOutOfRange { minutes });
    }
    Ok(minutes as u16)
}

/// Combines a calendar day with a minute offset from midnight.
pub fn add_minutes(day: NaiveDate, minutes: u16) -> NaiveDateTime {
    let base = day.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    base + chrono::Duration::minutes(minutes as i64)
}

/// Returns `true` if `other` falls on calendar day `day`.
pub fn same_day(day: NaiveDate, other: NaiveDateTime) -> bool {
    day == other.date()
}
