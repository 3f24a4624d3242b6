//! RAMA mooring array specifics.
//!
//! The RAMA feed is a WFS FeatureCollection, so positions live in
//! `geometry.coordinates` (`[lon, lat]`) rather than in the properties.

use serde_json::{json, Value};
use shared::models::ReportingStatus;
use std::borrow::Cow;

use crate::fields::{self, RawRecord};

/// Empty collection handed to the dashboard when the feed is unavailable.
pub fn empty_collection() -> Value {
    json!({ "type": "FeatureCollection", "features": [] })
}

/// Lifts a GeoJSON feature into a flat record: its properties plus
/// `longitude`/`latitude` taken from a point geometry.
///
/// Keys already present in the properties are left alone. Records that are
/// not features are returned unchanged.
pub fn flatten_feature(record: &RawRecord) -> Cow<'_, RawRecord> {
    let properties = match record.get("properties") {
        Some(Value::Object(properties)) if record.contains_key("geometry") => properties,
        _ => return Cow::Borrowed(record),
    };

    let mut flat = properties.clone();
    let coordinates = record
        .get("geometry")
        .and_then(|geometry| geometry.get("coordinates"))
        .and_then(Value::as_array);
    if let Some([lon, lat, ..]) = coordinates.map(Vec::as_slice) {
        flat.entry("longitude").or_insert_with(|| lon.clone());
        flat.entry("latitude").or_insert_with(|| lat.clone());
    }
    Cow::Owned(flat)
}

/// Maps the provider's reporting flag to a status.
///
/// Only phrasings seen upstream are mapped; anything else is kept verbatim
/// so new values show up instead of being guessed.
pub fn parse_reporting_status(text: &str) -> ReportingStatus {
    let normalized = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase();
    match normalized.as_str() {
        "reporting" => ReportingStatus::Reporting,
        "not reporting" | "not-reporting" | "notreporting" => ReportingStatus::NotReporting,
        _ => ReportingStatus::Unrecognized(text.to_string()),
    }
}

pub fn reporting_status(record: &RawRecord) -> Option<ReportingStatus> {
    fields::resolve_text(record, &fields::REPORTING_STATUS)
        .map(|resolved| parse_reporting_status(&resolved.value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_flatten_feature_takes_point_coordinates() {
        let feature = record(json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [80.5, -1.5] },
            "properties": { "buoyId": "23001", "Reporting": "Reporting" }
        }));
        let flat = flatten_feature(&feature);
        assert_eq!(flat.get("longitude"), Some(&json!(80.5)));
        assert_eq!(flat.get("latitude"), Some(&json!(-1.5)));
        assert_eq!(flat.get("buoyId"), Some(&json!("23001")));
        assert!(flat.get("geometry").is_none());
    }

    #[test]
    fn test_flatten_feature_keeps_property_coordinates() {
        let feature = record(json!({
            "geometry": { "coordinates": [80.5, -1.5] },
            "properties": { "latitude": 4.0 }
        }));
        let flat = flatten_feature(&feature);
        assert_eq!(flat.get("latitude"), Some(&json!(4.0)));
        assert_eq!(flat.get("longitude"), Some(&json!(80.5)));
    }

    #[test]
    fn test_flatten_feature_without_geometry_is_untouched() {
        let plain = record(json!({ "lat": 1.0, "lon": 2.0 }));
        assert!(matches!(flatten_feature(&plain), Cow::Borrowed(_)));
    }

    #[test]
    fn test_flatten_feature_with_null_geometry() {
        let feature = record(json!({ "geometry": null, "properties": { "name": "x" } }));
        let flat = flatten_feature(&feature);
        assert!(flat.get("latitude").is_none());
        assert_eq!(flat.get("name"), Some(&json!("x")));
    }

    #[test]
    fn test_reporting_status_known_phrasings() {
        assert_eq!(parse_reporting_status("Reporting"), ReportingStatus::Reporting);
        assert_eq!(parse_reporting_status(" REPORTING "), ReportingStatus::Reporting);
        assert_eq!(parse_reporting_status("Not Reporting"), ReportingStatus::NotReporting);
        assert_eq!(parse_reporting_status("not  reporting"), ReportingStatus::NotReporting);
        assert_eq!(parse_reporting_status("Not-Reporting"), ReportingStatus::NotReporting);
    }

    #[test]
    fn test_reporting_status_unknown_phrasing_is_preserved() {
        assert_eq!(
            parse_reporting_status("Intermittently reporting"),
            ReportingStatus::Unrecognized("Intermittently reporting".to_string())
        );
    }

    #[test]
    fn test_reporting_status_from_record() {
        let flat = record(json!({ "REPORTING": "Not Reporting" }));
        assert_eq!(reporting_status(&flat), Some(ReportingStatus::NotReporting));
        assert_eq!(reporting_status(&record(json!({}))), None);
    }
}
