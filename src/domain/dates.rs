use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use regex::Regex;

/// Day-month-year with `-` or `/` separators and a 2 or 4 digit year.
static DMY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[-/](\d{1,2})[-/](\d{4}|\d{2})$").expect("valid DMY pattern")
});

/// Two-digit years below this belong to the 2000s.
const CENTURY_PIVOT: i32 = 70;

/// Anything the date parser accepts.
#[derive(Debug, Clone, Copy)]
pub enum DateInput<'a> {
    Text(&'a str),
    Native(DateTime<Utc>),
}

impl<'a> From<&'a str> for DateInput<'a> {
    fn from(s: &'a str) -> Self {
        DateInput::Text(s)
    }
}

impl<'a> From<&'a String> for DateInput<'a> {
    fn from(s: &'a String) -> Self {
        DateInput::Text(s.as_str())
    }
}

impl From<DateTime<Utc>> for DateInput<'_> {
    fn from(dt: DateTime<Utc>) -> Self {
        DateInput::Native(dt)
    }
}

/// The current time at the precision timestamps are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Parse a date, falling back to the current time.
///
/// Results are truncated to milliseconds so they survive a store round trip.
pub fn parse_date<'a>(input: impl Into<DateInput<'a>>) -> DateTime<Utc> {
    match input.into() {
        DateInput::Native(dt) => dt.trunc_subsecs(3),
        DateInput::Text(s) => try_parse_date(s).unwrap_or_else(now),
    }
}

/// Parse a date and render it as an ISO-8601 string with millisecond precision.
pub fn to_iso<'a>(input: impl Into<DateInput<'a>>) -> String {
    iso_string(&parse_date(input))
}

/// Render a timestamp the way it is persisted: `2024-01-31T00:00:00.000Z`.
pub fn iso_string(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Render an ISO date as `DD-MM-YYYY`. Unparseable input is returned as-is.
pub fn fmt_date(iso: &str) -> String {
    match try_parse_date(iso) {
        Some(dt) => display_date(&dt),
        None => iso.to_string(),
    }
}

/// Day-month-year display form of a timestamp.
pub fn display_date(dt: &DateTime<Utc>) -> String {
    dt.format("%d-%m-%Y").to_string()
}

/// Strict parse: day-month-year first, then the generic formats.
/// Millisecond precision, like [`now`].
pub fn try_parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    parse_dmy(input)
        .or_else(|| parse_generic(input))
        .map(|dt| dt.trunc_subsecs(3))
}

fn parse_dmy(input: &str) -> Option<DateTime<Utc>> {
    let caps = DMY.captures(input)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year_str = &caps[3];
    let mut year: i32 = year_str.parse().ok()?;
    if year_str.len() == 2 {
        year += if year < CENTURY_PIVOT { 2000 } else { 1900 };
    }
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

fn parse_generic(input: &str) -> Option<DateTime<Utc>> {
    // `Wed Jan 31 2024 00:00:00 GMT+0530 (India Standard Time)`
    let input = match input.find(" (") {
        Some(idx) if input.ends_with(')') => &input[..idx],
        _ => input,
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(input, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(input, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

/// Timestamps carrying their own offset (`%z` takes `+0530` and `+05:30`).
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%a %b %d %Y %H:%M:%S GMT%z",
];

/// Wall-clock timestamps, read as UTC.
const NAIVE_DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%B %d, %Y %H:%M:%S",
    "%B %d %Y %H:%M:%S",
];

/// Calendar dates, read as UTC midnight. `%B` also accepts short month names.
const NAIVE_DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%a %b %d %Y",
];

/// Serde adapter for timestamps stored as ISO strings.
/// Deserializing never fails: unreadable values become the current time.
pub mod iso_format {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::iso_string(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(s) => super::parse_date(s.as_str()),
            _ => super::now(),
        })
    }

    /// Same as the parent module, for optional timestamps.
    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};
        use serde_json::Value;

        pub fn serialize<S: Serializer>(
            dt: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => serializer.serialize_str(&super::super::iso_string(dt)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let value = Option::<Value>::deserialize(deserializer)?;
            Ok(match value {
                Some(Value::String(s)) => super::super::try_parse_date(&s),
                _ => None,
            })
        }
    }
}
