use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use shared::models::TimeSeriesPoint;

use super::{balanced_array, script_bodies};

static SERIES_DATA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"series\s*:\s*\[\s*\{[\s\S]*?data\s*:\s*\[").expect("valid series pattern")
});

static ANY_DATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"data\s*:\s*\[").expect("valid data pattern"));

static PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\s*(-?\d+)\s*,\s*([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)\s*\]")
        .expect("valid pair pattern")
});

/// Finds the `data` array of a Highcharts/Highstock series; timestamps are
/// epoch milliseconds.
pub fn extract(document: &Html) -> Option<Vec<TimeSeriesPoint>> {
    script_bodies(document)
        .filter(|script| script.contains("Highcharts") || script.contains("Highstock"))
        .find_map(|script| {
            [&*SERIES_DATA, &*ANY_DATA].into_iter().find_map(|pattern| {
                let found = pattern.find(&script)?;
                let array = balanced_array(&script, found.end() - 1)?;
                let points = parse_pairs(array);
                (!points.is_empty()).then_some(points)
            })
        })
}

fn parse_pairs(array: &str) -> Vec<TimeSeriesPoint> {
    PAIR.captures_iter(array)
        .filter_map(|captures| {
            let millis: i64 = captures[1].parse().ok()?;
            let value: f64 = captures[2].parse().ok()?;
            let timestamp = DateTime::from_timestamp_millis(millis)?;
            value
                .is_finite()
                .then(|| TimeSeriesPoint::new(timestamp, value))
        })
        .collect()
}
