//! Locating a time series embedded in an upstream chart page.
//!
//! Five independent strategies, tried in [`Strategy::ALL`] order. A strategy
//! that finds nothing (or trips over malformed input) simply yields `None`
//! and the next one runs.

mod dygraph;
mod hidden;
mod highcharts;
mod json_script;
mod table;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Serialize;
use shared::models::TimeSeriesPoint;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::parse::{epoch_to_instant, parse_date, parse_number};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Strategy {
    #[serde(rename = "Highcharts")]
    Highcharts,
    #[serde(rename = "Dygraph")]
    Dygraph,
    #[serde(rename = "HTML Table")]
    HtmlTable,
    #[serde(rename = "JSON Script")]
    JsonScript,
    #[serde(rename = "Hidden Elements")]
    HiddenElements,
}

impl Strategy {
    /// Priority order, most reliable against the upstream site first.
    pub const ALL: [Strategy; 5] = [
        Strategy::Highcharts,
        Strategy::Dygraph,
        Strategy::HtmlTable,
        Strategy::JsonScript,
        Strategy::HiddenElements,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Highcharts => "Highcharts",
            Strategy::Dygraph => "Dygraph",
            Strategy::HtmlTable => "HTML Table",
            Strategy::JsonScript => "JSON Script",
            Strategy::HiddenElements => "Hidden Elements",
        }
    }

    pub fn extract(&self, document: &Html) -> Option<Vec<TimeSeriesPoint>> {
        let points = match self {
            Strategy::Highcharts => highcharts::extract(document),
            Strategy::Dygraph => dygraph::extract(document),
            Strategy::HtmlTable => table::extract(document),
            Strategy::JsonScript => json_script::extract(document),
            Strategy::HiddenElements => hidden::extract(document),
        };
        points.filter(|points| !points.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Extraction {
    pub strategy: Strategy,
    pub points: Vec<TimeSeriesPoint>,
}

/// Runs the strategies in order and returns the first non-empty series.
pub fn run_cascade(document: &Html, sink: &dyn DiagnosticSink) -> Option<Extraction> {
    for strategy in Strategy::ALL {
        let points = strategy.extract(document);
        sink.emit(Diagnostic::StrategyAttempted {
            strategy,
            points: points.as_ref().map_or(0, Vec::len),
        });
        if let Some(points) = points {
            return Some(Extraction { strategy, points });
        }
    }
    None
}

static SCRIPT: Lazy<Selector> = Lazy::new(|| Selector::parse("script").expect("valid selector"));

fn script_bodies(document: &Html) -> impl Iterator<Item = String> + '_ {
    document
        .select(&SCRIPT)
        .map(|script| script.text().collect::<String>())
        .filter(|body| !body.trim().is_empty())
}

/// Returns the bracketed array starting at byte `open` (which must be `[`),
/// brackets included. Brackets inside string literals are ignored.
fn balanced_array(text: &str, open: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'[') {
        return None;
    }
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    for (offset, &byte) in bytes[open..].iter().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == q {
                quote = None;
            }
            continue;
        }
        match byte {
            b'"' | b'\'' => quote = Some(byte),
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return text.get(open..open + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Reads a chart time cell: a 10 to 13 digit epoch or a date string,
/// optionally quoted. Shorter integers are row indexes, not times.
fn parse_time_token(token: &str) -> Option<DateTime<Utc>> {
    let token = token.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    match token.parse::<i64>() {
        Ok(epoch) if (10..=13).contains(&token.trim_start_matches('-').len()) => {
            epoch_to_instant(epoch)
        }
        Ok(_) => None,
        Err(_) => parse_date(token),
    }
}

/// Reads `time,value` lines, skipping headers and anything unparseable.
fn parse_delimited_lines(text: &str) -> Vec<TimeSeriesPoint> {
    text.lines()
        .filter_map(|line| {
            let mut cells = line.trim().split(',');
            let timestamp = parse_time_token(cells.next()?)?;
            let value = parse_number(cells.next()?)?;
            Some(TimeSeriesPoint::new(timestamp, value))
        })
        .collect()
}
