use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde_json::Value;
use shared::models::TimeSeriesPoint;

use super::{balanced_array, script_bodies};
use crate::parse::{epoch_to_instant, parse_date, parse_number};

static OBJECT_ARRAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[\s*\{[\s\S]*?"date"[\s\S]*?\}\s*\]"#).expect("valid object array pattern")
});

static TUPLE_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\s*\[\s*-?\d{10,13}\s*,").expect("valid tuple array pattern"));

/// Scans inline scripts for a JSON literal holding the series: either
/// `[{"date": .., "value": ..}, ..]` or `[[epoch, value], ..]`.
pub fn extract(document: &Html) -> Option<Vec<TimeSeriesPoint>> {
    script_bodies(document).find_map(|script| {
        object_array(&script)
            .or_else(|| tuple_array(&script))
            .filter(|points| !points.is_empty())
    })
}

/// Parses a JSON text in either supported shape.
pub(super) fn points_from_json(text: &str) -> Option<Vec<TimeSeriesPoint>> {
    let items: Vec<Value> = serde_json::from_str(text.trim()).ok()?;
    let points = match items.first()? {
        Value::Object(first) if first.contains_key("date") => {
            items.iter().filter_map(object_point).collect()
        }
        Value::Array(_) => items.iter().filter_map(tuple_point).collect(),
        _ => return None,
    };
    Some(points)
}

/// Matches that are not valid JSON, such as JS object literals, are skipped.
fn object_array(script: &str) -> Option<Vec<TimeSeriesPoint>> {
    OBJECT_ARRAY.find_iter(script).find_map(|found| {
        let literal = balanced_array(script, found.start()).unwrap_or(found.as_str());
        points_from_json(literal).filter(|points| !points.is_empty())
    })
}

fn tuple_array(script: &str) -> Option<Vec<TimeSeriesPoint>> {
    TUPLE_ARRAY.find_iter(script).find_map(|found| {
        let literal = balanced_array(script, found.start())?;
        points_from_json(literal).filter(|points| !points.is_empty())
    })
}

fn object_point(item: &Value) -> Option<TimeSeriesPoint> {
    let object = item.as_object()?;
    let timestamp = match object.get("date")? {
        Value::String(text) => parse_date(text)?,
        Value::Number(number) => epoch_to_instant(number.as_i64()?)?,
        _ => return None,
    };
    let value = ["value", "y"]
        .into_iter()
        .find_map(|key| object.get(key).and_then(json_number))?;
    Some(TimeSeriesPoint::new(timestamp, value))
}

fn tuple_point(item: &Value) -> Option<TimeSeriesPoint> {
    let pair = item.as_array()?;
    let timestamp = epoch_to_instant(pair.first()?.as_i64()?)?;
    let value = json_number(pair.get(1)?)?;
    Some(TimeSeriesPoint::new(timestamp, value))
}

fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|v| v.is_finite()),
        Value::String(text) => parse_number(text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(script: &str) -> Html {
        Html::parse_document(&format!("<html><body><script>{}</script></body></html>", script))
    }

    #[test]
    fn test_object_array_with_value_key() {
        let document = page(
            r#"var series = [{"date": "2024-01-05 00:00", "value": 28.5}, {"date": "2024-01-05 01:00", "value": "28.7"}];"#,
        );
        let points = extract(&document).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timestamp.to_rfc3339(), "2024-01-05T00:00:00+00:00");
        assert_eq!(points[1].value, 28.7);
    }

    #[test]
    fn test_object_array_with_y_key_and_epoch_dates() {
        let document = page(r#"render([{"date": 1704412800, "y": 1.5}, {"date": 1704416400000, "y": 2}]);"#);
        let points = extract(&document).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timestamp.to_rfc3339(), "2024-01-05T00:00:00+00:00");
        assert_eq!(points[1].timestamp.to_rfc3339(), "2024-01-05T01:00:00+00:00");
    }

    #[test]
    fn test_object_without_value_is_skipped() {
        let document = page(
            r#"var d = [{"date": "2024-01-05", "note": "offline"}, {"date": "2024-01-06", "value": 3}];"#,
        );
        let points = extract(&document).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, 3.0);
    }

    #[test]
    fn test_tuple_array() {
        let document = page("var raw = [[1704412800000, 27.0], [1704416400000, 27.25]];");
        let points = extract(&document).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].value, 27.25);
    }

    #[test]
    fn test_invalid_json_is_ignored() {
        let document = page("var d = [{date: '2024-01-05', value: 1}];");
        assert_eq!(extract(&document), None);
    }

    #[test]
    fn test_later_match_used_when_first_is_not_json() {
        let document = page(
            r#"var cols = [{label: "date"}]; var series = [{"date": "2024-01-05", "value": 1.5}];"#,
        );
        let points = extract(&document).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, 1.5);

        let document = page("var ids = [[1704412800000, oops]]; var raw = [[1704412800000, 27.0]];");
        assert_eq!(extract(&document).unwrap()[0].value, 27.0);
    }

    #[test]
    fn test_points_from_json_rejects_other_shapes() {
        assert_eq!(points_from_json(r#"[{"when": "2024-01-05", "value": 1}]"#), None);
        assert_eq!(points_from_json("[1, 2, 3]"), None);
        assert_eq!(points_from_json("[]"), None);
        assert_eq!(points_from_json("not json"), None);
    }
}
