//! Lenient number and date parsing for upstream text.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static LEADING_FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("valid float pattern")
});

static ISO_DATE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})").expect("valid iso pattern"));

/// `MM/DD/YYYY`, `MM-DD-YYYY` and the short `M/D/YY` forms, with an optional time.
static US_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{1,2})([/-])(\d{1,2})[/-](\d{4}|\d{2})(?:[ T]+(\d{1,2}):(\d{2})(?::(\d{2}))?)?",
    )
    .expect("valid us date pattern")
});

const ISO_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%d %H:%M:%S%.fZ",
];

const GENERIC_DATETIME_FORMATS: [&str; 5] = [
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d-%b-%Y %H:%M:%S",
    "%d-%b-%Y %H:%M",
    "%d %b %Y %H:%M",
];

const GENERIC_DATE_FORMATS: [&str; 5] = ["%Y/%m/%d", "%d %b %Y", "%d-%b-%Y", "%b %d, %Y", "%B %d, %Y"];

/// Parses the numeric prefix of `text`, ignoring trailing units.
///
/// Returns `None` unless the prefix is a finite number.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    let found = LEADING_FLOAT.find(text)?;
    found.as_str().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parses a date cell the way upstream pages write them.
///
/// Naive values are read as UTC.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if ISO_DATE_PREFIX.is_match(text) {
        return parse_iso(text);
    }
    if let Some(captures) = US_DATE.captures(text) {
        let separator = &captures[2];
        let year_text = &captures[4];
        // MM-DD-YY is not an accepted form, only the slash variant may be short
        if separator == "-" && year_text.len() != 4 {
            return parse_generic(text);
        }
        let month: u32 = captures[1].parse().ok()?;
        let day: u32 = captures[3].parse().ok()?;
        let year = expand_year(year_text)?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let time = match (captures.get(5), captures.get(6)) {
            (Some(hour), Some(minute)) => {
                let second = captures
                    .get(7)
                    .map(|s| s.as_str().parse().ok())
                    .unwrap_or(Some(0))?;
                NaiveTime::from_hms_opt(hour.as_str().parse().ok()?, minute.as_str().parse().ok()?, second)?
            }
            _ => NaiveTime::from_hms_opt(0, 0, 0)?,
        };
        return Some(date.and_time(time).and_utc());
    }
    parse_generic(text)
}

fn parse_iso(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ISO_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    // Anything after a valid calendar date (zone names, "hrs", ...) is dropped.
    let captures = ISO_DATE_PREFIX.captures(text)?;
    let date = NaiveDate::from_ymd_opt(
        captures[1].parse().ok()?,
        captures[2].parse().ok()?,
        captures[3].parse().ok()?,
    )?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

fn parse_generic(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in GENERIC_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    for format in GENERIC_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }
    None
}

fn expand_year(text: &str) -> Option<i32> {
    let year: i32 = text.parse().ok()?;
    if text.len() == 2 {
        // Same pivot as chrono's %y
        Some(if year < 70 { 2000 + year } else { 1900 + year })
    } else {
        Some(year)
    }
}

/// Converts an epoch number to an instant. Ten-digit values are seconds,
/// anything else milliseconds.
pub fn epoch_to_instant(epoch: i64) -> Option<DateTime<Utc>> {
    if (1_000_000_000..10_000_000_000).contains(&epoch.abs()) {
        DateTime::from_timestamp(epoch, 0)
    } else {
        DateTime::from_timestamp_millis(epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_parse_number_plain() {
        assert_eq!(parse_number("28.5"), Some(28.5));
        assert_eq!(parse_number("  -3 "), Some(-3.0));
        assert_eq!(parse_number(".5"), Some(0.5));
        assert_eq!(parse_number("1e3"), Some(1000.0));
    }

    #[test]
    fn test_parse_number_ignores_trailing_units() {
        assert_eq!(parse_number("28.5 °C"), Some(28.5));
        assert_eq!(parse_number("12.0N"), Some(12.0));
    }

    #[test]
    fn test_parse_number_rejects_non_numbers() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("Infinity"), None);
        assert_eq!(parse_number("N/A"), None);
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number("1e999"), None);
    }

    #[test]
    fn test_parse_date_iso() {
        assert_eq!(parse_date("2024-01-05"), Some(utc("2024-01-05T00:00:00Z")));
        assert_eq!(parse_date("2024-01-05T06:30:00Z"), Some(utc("2024-01-05T06:30:00Z")));
        assert_eq!(
            parse_date("2024-01-05T06:30:00+05:30"),
            Some(utc("2024-01-05T01:00:00Z"))
        );
        assert_eq!(parse_date("2024-01-05 06:30"), Some(utc("2024-01-05T06:30:00Z")));
        assert_eq!(parse_date("2024-01-05 06:30:15"), Some(utc("2024-01-05T06:30:15Z")));
    }

    #[test]
    fn test_parse_date_iso_prefix_with_suffix() {
        assert_eq!(parse_date("2024-01-05 IST"), Some(utc("2024-01-05T00:00:00Z")));
    }

    #[test]
    fn test_parse_date_iso_invalid_calendar_date() {
        assert_eq!(parse_date("2023-02-29"), None);
        assert_eq!(parse_date("2024-13-01"), None);
    }

    #[test]
    fn test_parse_date_us_forms() {
        assert_eq!(parse_date("01/05/2024"), Some(utc("2024-01-05T00:00:00Z")));
        assert_eq!(parse_date("01-05-2024"), Some(utc("2024-01-05T00:00:00Z")));
        assert_eq!(parse_date("1/5/24"), Some(utc("2024-01-05T00:00:00Z")));
        assert_eq!(parse_date("12/31/99"), Some(utc("1999-12-31T00:00:00Z")));
        assert_eq!(parse_date("01/05/2024 13:45"), Some(utc("2024-01-05T13:45:00Z")));
        assert_eq!(parse_date("01/05/2024 13:45:10"), Some(utc("2024-01-05T13:45:10Z")));
    }

    #[test]
    fn test_parse_date_us_out_of_range() {
        assert_eq!(parse_date("13/05/2024"), None);
        assert_eq!(parse_date("02/30/2024"), None);
    }

    #[test]
    fn test_parse_date_generic_forms() {
        assert_eq!(parse_date("2024/01/05"), Some(utc("2024-01-05T00:00:00Z")));
        assert_eq!(parse_date("2024/01/05 10:00"), Some(utc("2024-01-05T10:00:00Z")));
        assert_eq!(parse_date("05 Jan 2024"), Some(utc("2024-01-05T00:00:00Z")));
        assert_eq!(parse_date("Jan 05, 2024"), Some(utc("2024-01-05T00:00:00Z")));
        assert_eq!(
            parse_date("Fri, 05 Jan 2024 10:00:00 +0000"),
            Some(utc("2024-01-05T10:00:00Z"))
        );
    }

    #[test]
    fn test_parse_date_rejects_text() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("Date"), None);
        assert_eq!(parse_date("Air Temperature"), None);
        assert_eq!(parse_date("28.5"), None);
    }

    #[test]
    fn test_epoch_to_instant() {
        assert_eq!(epoch_to_instant(0), Some(utc("1970-01-01T00:00:00Z")));
        assert_eq!(epoch_to_instant(86_400_000), Some(utc("1970-01-02T00:00:00Z")));
        assert_eq!(epoch_to_instant(1_704_412_800), Some(utc("2024-01-05T00:00:00Z")));
        assert_eq!(
            epoch_to_instant(1_704_412_800_000),
            Some(utc("2024-01-05T00:00:00Z"))
        );
        assert_eq!(
            epoch_to_instant(12_345_678_901),
            Some(utc("1970-05-23T21:21:18.901Z"))
        );
    }
}
