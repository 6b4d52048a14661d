use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::error::{MomoError, Result};

/// Zone every timestamp is rendered in unless settings say otherwise.
/// Kigali is UTC+02:00 all year.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Africa::Kigali;

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

fn amount_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect()
}

/// Currency text to a non-negative amount.
///
/// Everything except digits and `.` is thrown away (`"1,234.50 RWF"` becomes
/// `1234.5`). Missing text, text with no digits, and leftovers that still do
/// not parse (`"1.2.3"`) all degrade to `0.0` instead of failing.
pub fn clean_amount(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };
    let cleaned = amount_digits(raw);
    if cleaned.is_empty() {
        return 0.0;
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// True when `clean_amount` had to fall back to zero for this text.
pub fn amount_is_degraded(raw: Option<&str>) -> bool {
    let Some(raw) = raw else {
        return true;
    };
    let cleaned = amount_digits(raw);
    !matches!(cleaned.parse::<f64>(), Ok(v) if v.is_finite())
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| MomoError::Settings(format!("unknown timezone {name:?}: {e}")))
}

/// Epoch milliseconds (as text) to a timestamp in the default zone.
#[allow(dead_code)]
pub fn parse_timestamp(epoch_millis: &str) -> Result<DateTime<FixedOffset>> {
    parse_timestamp_in(epoch_millis, &DEFAULT_TIMEZONE)
}

pub fn parse_timestamp_in(epoch_millis: &str, tz: &Tz) -> Result<DateTime<FixedOffset>> {
    let millis: i64 = epoch_millis
        .trim()
        .parse()
        .map_err(|_| MomoError::MalformedTimestamp(epoch_millis.to_string()))?;
    let utc = DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| MomoError::MalformedTimestamp(epoch_millis.to_string()))?;
    Ok(utc.with_timezone(tz).fixed_offset())
}

/// Export timestamps: RFC 3339 (shifted into `tz`), or a naive date/time read
/// as wall-clock time in `tz`.
pub fn parse_export_timestamp(raw: &str, tz: &Tz) -> Result<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(tz).fixed_offset());
    }
    let naive = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| MomoError::MalformedTimestamp(raw.to_string()))?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| MomoError::MalformedTimestamp(raw.to_string()))
}

/// Validate a `YYYY-MM-DD` query bound.
pub fn parse_query_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| MomoError::InvalidDate(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Parties
// ---------------------------------------------------------------------------

pub fn clean_party(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Strip whitespace and the parentheses templates wrap phone numbers in.
pub fn clean_phone(raw: &str) -> Option<String> {
    let s = raw.trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace());
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
