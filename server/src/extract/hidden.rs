use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use shared::models::TimeSeriesPoint;

use super::json_script::points_from_json;
use super::parse_delimited_lines;

/// Shorter payloads are labels or ids, not series.
const MIN_PAYLOAD_LEN: usize = 50;

/// A hidden input needs more comma-separated lines than this to count as a
/// CSV payload.
const MIN_HIDDEN_LINES: usize = 5;

const DATA_ATTRIBUTES: [&str; 3] = ["data-chart", "data-series", "data-values"];

static HIDDEN_INPUT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"input[type="hidden"]"#).expect("valid selector"));

static DATA_ELEMENT: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("[data-chart], [data-series], [data-values]").expect("valid selector")
});

pub fn extract(document: &Html) -> Option<Vec<TimeSeriesPoint>> {
    let from_inputs = document
        .select(&HIDDEN_INPUT)
        .filter_map(|input| input.value().attr("value"))
        .filter(|value| {
            value.lines().filter(|line| line.contains(',')).count() > MIN_HIDDEN_LINES
        })
        .find_map(payload_points);

    from_inputs.or_else(|| {
        document
            .select(&DATA_ELEMENT)
            .filter_map(data_attribute)
            .find_map(payload_points)
    })
}

fn data_attribute(element: ElementRef<'_>) -> Option<&str> {
    DATA_ATTRIBUTES
        .into_iter()
        .find_map(|name| element.value().attr(name))
}

fn payload_points(payload: &str) -> Option<Vec<TimeSeriesPoint>> {
    if !payload.contains(',') || payload.len() <= MIN_PAYLOAD_LEN {
        return None;
    }
    let points = parse_delimited_lines(payload);
    let points = if points.is_empty() {
        points_from_json(payload)?
    } else {
        points
    };
    (!points.is_empty()).then_some(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{}</body></html>", body))
    }

    #[test]
    fn test_hidden_input_csv() {
        let csv = "Date,Value\n2024-01-05,1.0\n2024-01-06,2.0\n2024-01-07,3.0\n2024-01-08,4.0\n2024-01-09,5.0";
        let document = page(&format!(r#"<input type="hidden" id="series" value="{}">"#, csv));
        let points = extract(&document).unwrap();
        assert_eq!(points.len(), 5);
        assert_eq!(points[4].value, 5.0);
    }

    #[test]
    fn test_hidden_input_needs_enough_lines() {
        let csv = "2024-01-05 00:00:00,1.0\n2024-01-06 00:00:00,2.0\n2024-01-07 00:00:00,3.0";
        let document = page(&format!(r#"<input type="hidden" value="{}">"#, csv));
        assert_eq!(extract(&document), None);
    }

    #[test]
    fn test_hidden_input_counts_only_comma_lines() {
        let value = "Sea surface temperature\nAD06\nhourly\nunits: C\nsource: INCOIS\n2024-01-05 00:00:00,1.0\n2024-01-06 00:00:00,2.0";
        let document = page(&format!(r#"<input type="hidden" value="{}">"#, value));
        assert_eq!(extract(&document), None);
    }

    #[test]
    fn test_data_attribute_json() {
        let document = page(
            r#"<div data-series='[{"date": "2024-01-05", "value": 1.5}, {"date": "2024-01-06", "value": 2.5}]'></div>"#,
        );
        let points = extract(&document).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 1.5);
    }

    #[test]
    fn test_data_attribute_csv() {
        let document = page(
            r#"<span data-values="2024-01-05 00:00,27.5
2024-01-05 01:00,27.75
2024-01-05 02:00,28"></span>"#,
        );
        let points = extract(&document).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[1].value, 27.75);
    }

    #[test]
    fn test_short_payload_is_ignored() {
        let document = page(r#"<div data-chart="2024-01-05,1"></div>"#);
        assert_eq!(extract(&document), None);
    }

    #[test]
    fn test_payload_without_comma_is_ignored() {
        let document = page(&format!(r#"<div data-chart="{}"></div>"#, "x".repeat(80)));
        assert_eq!(extract(&document), None);
    }
}
