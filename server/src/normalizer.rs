//! Turns one feed's raw payload into [`BuoyRecord`]s.

use serde_json::Value;
use shared::models::{BuoyRecord, FeedType, Region};
use std::collections::BTreeMap;

use crate::diagnostics::{Diagnostic, DiagnosticSink, ExclusionReason};
use crate::fields::{self, LogicalField, RawRecord};
use crate::rama;

/// Object properties that may hold the record array, in priority order.
pub const NESTED_ARRAY_KEYS: [&str; 6] = ["data", "buoys", "results", "features", "items", "list"];

/// Where the record array was found in an upstream payload.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedFeedPayload {
    DirectArray(Vec<Value>),
    NestedArray {
        property: &'static str,
        records: Vec<Value>,
    },
    Unrecognized,
}

impl ParsedFeedPayload {
    /// Picks the first non-empty array among [`NESTED_ARRAY_KEYS`]. An object
    /// whose candidate arrays are all empty is still a recognized shape.
    pub fn from_value(value: Value) -> ParsedFeedPayload {
        match value {
            Value::Array(records) => ParsedFeedPayload::DirectArray(records),
            Value::Object(mut object) => {
                let non_empty = NESTED_ARRAY_KEYS.into_iter().find(|property| {
                    matches!(object.get(*property), Some(Value::Array(records)) if !records.is_empty())
                });
                if let Some(property) = non_empty {
                    if let Some(Value::Array(records)) = object.remove(property) {
                        return ParsedFeedPayload::NestedArray { property, records };
                    }
                }
                let first_empty = NESTED_ARRAY_KEYS
                    .into_iter()
                    .find(|property| object.get(*property).map_or(false, Value::is_array));
                match first_empty {
                    Some(property) => ParsedFeedPayload::NestedArray {
                        property,
                        records: Vec::new(),
                    },
                    None => ParsedFeedPayload::Unrecognized,
                }
            }
            _ => ParsedFeedPayload::Unrecognized,
        }
    }

    pub fn records(&self) -> &[Value] {
        match self {
            ParsedFeedPayload::DirectArray(records) => records,
            ParsedFeedPayload::NestedArray { records, .. } => records,
            ParsedFeedPayload::Unrecognized => &[],
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, ParsedFeedPayload::Unrecognized)
    }
}

/// Outcome of normalizing one feed.
#[derive(Clone, Debug, PartialEq)]
pub struct Normalized {
    pub records: Vec<BuoyRecord>,
    /// Number of records in the upstream array, before exclusion.
    pub raw_count: usize,
    pub excluded: usize,
}

pub fn normalize_payload(
    payload: &ParsedFeedPayload,
    feed: FeedType,
    sink: &dyn DiagnosticSink,
) -> Normalized {
    if !payload.is_recognized() {
        sink.emit(Diagnostic::ShapeUnrecognized { feed });
    }
    normalize(payload.records(), feed, sink)
}

/// Normalizes every raw record of `feed`, dropping those without finite
/// coordinates.
///
/// Ids are assigned from the 1-based position in `raw`, so dropped records
/// leave gaps and repeated calls produce identical output.
pub fn normalize(raw: &[Value], feed: FeedType, sink: &dyn DiagnosticSink) -> Normalized {
    let mut records = Vec::with_capacity(raw.len());
    let mut excluded = 0;

    for (index, value) in raw.iter().enumerate() {
        match normalize_record(value, index, feed, sink) {
            Ok(record) => {
                sink.emit(Diagnostic::RecordKept {
                    feed,
                    index,
                    id: record.id.clone(),
                });
                records.push(record);
            }
            Err(reason) => {
                sink.emit(Diagnostic::RecordExcluded {
                    feed,
                    index,
                    reason,
                });
                excluded += 1;
            }
        }
    }

    Normalized {
        records,
        raw_count: raw.len(),
        excluded,
    }
}

pub fn synthetic_id(feed: FeedType, index: usize) -> String {
    format!("{}_{:03}", feed, index + 1)
}

fn normalize_record(
    value: &Value,
    index: usize,
    feed: FeedType,
    sink: &dyn DiagnosticSink,
) -> Result<BuoyRecord, ExclusionReason> {
    let object = value.as_object().ok_or(ExclusionReason::NotAnObject)?;
    let record = rama::flatten_feature(object);

    let latitude = resolve_coordinate(&record, &fields::LATITUDE, index, feed, sink);
    let longitude = resolve_coordinate(&record, &fields::LONGITUDE, index, feed, sink);
    let (latitude, longitude) = match (latitude, longitude) {
        (Some(lat), Some(lon)) => (lat, lon),
        (None, Some(_)) => return Err(ExclusionReason::MissingLatitude),
        (Some(_), None) => return Err(ExclusionReason::MissingLongitude),
        (None, None) => return Err(ExclusionReason::MissingCoordinates),
    };

    let id = synthetic_id(feed, index);
    let buoy_id = fields::resolve_text(&record, &fields::BUOY_ID)
        .map(|resolved| resolved.value)
        .unwrap_or_else(|| id.clone());

    let mut parameters = BTreeMap::new();
    let extra: &[&LogicalField] = match feed {
        FeedType::Rama => &fields::RAMA_PARAMETERS,
        _ => &[],
    };
    for field in fields::COMMON_PARAMETERS.iter().chain(extra) {
        let reading = fields::resolve_reading(&record, field);
        match &reading {
            Some(resolved) => sink.emit(Diagnostic::FieldResolved {
                feed,
                index,
                field: field.name,
                key: resolved.key,
            }),
            None => sink.emit(Diagnostic::FieldMissing {
                feed,
                index,
                field: field.name,
            }),
        }
        parameters.insert(field.name.to_string(), reading.map(|resolved| resolved.value));
    }

    let reporting_status = match feed {
        FeedType::Rama => rama::reporting_status(&record),
        _ => None,
    };

    Ok(BuoyRecord {
        id,
        buoy_id,
        latitude,
        longitude,
        feed_type: feed,
        region: Region::from_coordinates(latitude, longitude),
        reporting_status,
        parameters,
        raw_source: value.clone(),
    })
}

fn resolve_coordinate(
    record: &RawRecord,
    field: &LogicalField,
    index: usize,
    feed: FeedType,
    sink: &dyn DiagnosticSink,
) -> Option<f64> {
    match fields::resolve_number(record, field) {
        Some(resolved) => {
            sink.emit(Diagnostic::FieldResolved {
                feed,
                index,
                field: field.name,
                key: resolved.key,
            });
            Some(resolved.value)
        }
        None => {
            sink.emit(Diagnostic::FieldMissing {
                feed,
                index,
                field: field.name,
            });
            None
        }
    }
}
