use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use shared::models::TimeSeriesPoint;

use super::{balanced_array, parse_delimited_lines, parse_time_token, script_bodies};
use crate::parse::parse_number;

/// `new Dygraph(el, "Date,Value\n...")`
static CSV_ARGUMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"new\s+Dygraph[^,]*,\s*"((?:[^"\\]|\\.)*)""#).expect("valid csv pattern")
});

/// `new Dygraph(el, [[...], ...])`
static ARRAY_ARGUMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"new\s+Dygraph[^,]*,\s*\[").expect("valid array pattern"));

static ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\s*([^\[\],]+?)\s*,\s*([^\[\],]+?)\s*(?:,[^\[\]]*)?\]").expect("valid row pattern")
});

static DATE_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^new\s+Date\(\s*(.*?)\s*\)$").expect("valid date call pattern"));

/// Reads the data argument of a Dygraph constructor, either an escaped CSV
/// string or a nested array literal.
pub fn extract(document: &Html) -> Option<Vec<TimeSeriesPoint>> {
    script_bodies(document)
        .filter(|script| script.contains("Dygraph"))
        .find_map(|script| {
            let points = from_csv_argument(&script).or_else(|| from_array_argument(&script))?;
            (!points.is_empty()).then_some(points)
        })
}

fn from_csv_argument(script: &str) -> Option<Vec<TimeSeriesPoint>> {
    let captures = CSV_ARGUMENT.captures(script)?;
    let csv = unescape(&captures[1]);
    let points = parse_delimited_lines(&csv);
    (!points.is_empty()).then_some(points)
}

fn from_array_argument(script: &str) -> Option<Vec<TimeSeriesPoint>> {
    let found = ARRAY_ARGUMENT.find(script)?;
    let array = balanced_array(script, found.end() - 1)?;
    let points: Vec<_> = ROW
        .captures_iter(array)
        .filter_map(|captures| {
            let time = strip_date_call(&captures[1]);
            let timestamp = parse_time_token(time)?;
            let value = parse_number(&captures[2])?;
            Some(TimeSeriesPoint::new(timestamp, value))
        })
        .collect();
    (!points.is_empty()).then_some(points)
}

fn strip_date_call(token: &str) -> &str {
    let token = token.trim();
    DATE_CALL
        .captures(token)
        .and_then(|captures| captures.get(1))
        .map_or(token, |inner| inner.as_str())
}

fn unescape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => {}
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
