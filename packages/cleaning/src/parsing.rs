//! Cell-level parsers used by the cleaning steps.
//!
//! Every parser returns `None` for unusable input. Callers decide whether
//! that drops the row or marks a field absent; nothing here substitutes a
//! default value.

use chrono::{DateTime, Datelike as _, NaiveDate, NaiveDateTime, Timelike as _};

/// Datetime layouts tried in order before the RFC 3339 and date-only
/// fallbacks.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
];

/// Category values that mean "no category".
const NULL_SENTINELS: &[&str] = &["NONE", "NAN"];

/// Parses an incident timestamp.
///
/// Accepts Socrata floating timestamps (`2024-01-15T14:30:00.000`), the
/// space-separated variant, the portal export layout
/// (`01/15/2024 02:30:00 PM`), RFC 3339 with an offset (kept as its local
/// wall-clock time), and bare dates (midnight).
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Calendar fields derived from a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFields {
    /// Calendar year.
    pub year: i32,
    /// Month, 1-12.
    pub month: u32,
    /// Hour, 0-23.
    pub hour: u32,
    /// Day of week, 0 = Monday through 6 = Sunday.
    pub day_of_week: u32,
}

impl CalendarFields {
    /// Derives the calendar fields of `ts`.
    #[must_use]
    pub fn from_timestamp(ts: &NaiveDateTime) -> Self {
        Self {
            year: ts.year(),
            month: ts.month(),
            hour: ts.hour(),
            day_of_week: ts.weekday().num_days_from_monday(),
        }
    }
}

/// Trims and uppercases a category. Blank values and null sentinels
/// (`"NONE"`, `"NAN"`, any case) yield `None`.
#[must_use]
pub fn normalize_category(s: &str) -> Option<String> {
    let normalized = s.trim().to_uppercase();
    if normalized.is_empty() || NULL_SENTINELS.contains(&normalized.as_str()) {
        return None;
    }
    Some(normalized)
}

/// Coerces a coordinate cell to a finite number.
#[must_use]
pub fn parse_coordinate(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerces a count cell to a non-negative integer.
///
/// Integral decimals such as `"12.0"` are accepted. Negative, fractional,
/// non-finite, and non-numeric values yield `None`, never zero.
#[must_use]
pub fn parse_count(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Ok(n) = s.parse::<u64>() {
        return Some(n);
    }

    let value = s.parse::<f64>().ok()?;
    #[allow(clippy::cast_precision_loss)]
    let in_range = value.is_finite() && value >= 0.0 && value <= u64::MAX as f64;
    if in_range && value.fract() == 0.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        return Some(value as u64);
    }
    None
}
