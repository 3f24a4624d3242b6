//! Candidate key spellings for every logical buoy field, and the lookup
//! that walks them.
//!
//! Upstream feeds disagree on naming (`ARGO_POSITION_LATITUDE`, `lat`,
//! `LATITUDE`, ...) and change it between provider versions. Each logical
//! field owns one ordered list; the first listed key holding a usable value
//! wins.

use serde_json::{Map, Value};
use shared::models::Reading;

use crate::parse::parse_number;

pub type RawRecord = Map<String, Value>;

/// A logical field and the keys it may appear under, in priority order.
#[derive(Debug)]
pub struct LogicalField {
    pub name: &'static str,
    pub candidates: &'static [&'static str],
}

pub const LATITUDE: LogicalField = LogicalField {
    name: "latitude",
    candidates: &[
        "ARGO_POSITION_LATITUDE",
        "lat",
        "latitude",
        "LATITUDE",
        "Latitude",
        "ARGO_LAT",
        "LAT",
        "position_latitude",
        "pos_lat",
        "y",
        "Y",
    ],
};

pub const LONGITUDE: LogicalField = LogicalField {
    name: "longitude",
    candidates: &[
        "ARGO_POSITION_LONGITUDE",
        "lon",
        "longitude",
        "LONGITUDE",
        "Longitude",
        "ARGO_LON",
        "LON",
        "position_longitude",
        "pos_lon",
        "x",
        "X",
    ],
};

pub const BUOY_ID: LogicalField = LogicalField {
    name: "buoyId",
    candidates: &["buoyId", "BUOY_ID", "name", "id"],
};

pub const SEA_SURFACE_TEMPERATURE: LogicalField = LogicalField {
    name: "seaSurfaceTemperature",
    candidates: &["SST", "seaSurfaceTemperature", "sst", "SEA_SURFACE_TEMPERATURE"],
};

pub const SALINITY: LogicalField = LogicalField {
    name: "salinity",
    candidates: &["Salinity", "salinity", "SALINITY", "sal"],
};

pub const WAVE_HEIGHT: LogicalField = LogicalField {
    name: "waveHeight",
    candidates: &["WaveHeight", "waveHeight", "WAVE_HEIGHT", "wave_height", "waveheight"],
};

pub const WIND_SPEED: LogicalField = LogicalField {
    name: "windSpeed",
    candidates: &["WindSpeed", "windSpeed", "WIND_SPEED", "wind_speed", "windspeed"],
};

pub const AIR_TEMPERATURE: LogicalField = LogicalField {
    name: "airTemperature",
    candidates: &["airTemperature", "AIR_TEMPERATURE", "air_temperature", "temp"],
};

pub const WIND_DIRECTION: LogicalField = LogicalField {
    name: "windDirection",
    candidates: &["windDirection", "winddirection", "WIND_DIRECTION", "wind_direction"],
};

pub const AIR_PRESSURE: LogicalField = LogicalField {
    name: "pressure",
    candidates: &["pressure", "PRESSURE", "airPressure", "AIR_PRESSURE"],
};

pub const REPORTING_STATUS: LogicalField = LogicalField {
    name: "reportingStatus",
    candidates: &["Reporting", "reporting", "REPORTING", "reportingStatus"],
};

/// Readings every feed reports under `parameters`.
pub const COMMON_PARAMETERS: [&LogicalField; 5] = [
    &SEA_SURFACE_TEMPERATURE,
    &SALINITY,
    &WAVE_HEIGHT,
    &WIND_SPEED,
    &AIR_TEMPERATURE,
];

/// Extra readings carried by the RAMA mooring array.
pub const RAMA_PARAMETERS: [&LogicalField; 2] = [&WIND_DIRECTION, &AIR_PRESSURE];

/// A value together with the key it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolved<T> {
    pub key: &'static str,
    pub value: T,
}

/// Returns the first candidate holding a finite number (or a string with a
/// numeric prefix).
pub fn resolve_number(record: &RawRecord, field: &LogicalField) -> Option<Resolved<f64>> {
    first_match(record, field, |value| match value {
        Value::Number(n) => n.as_f64().filter(|n| n.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    })
}

/// Returns the first candidate holding a number or a non-blank string.
///
/// Numeric strings become [`Reading::Number`]; other text passes through.
pub fn resolve_reading(record: &RawRecord, field: &LogicalField) -> Option<Resolved<Reading>> {
    first_match(record, field, |value| match value {
        Value::Number(n) => n.as_f64().filter(|n| n.is_finite()).map(Reading::Number),
        Value::String(s) if !s.trim().is_empty() => Some(match parse_number(s) {
            Some(n) if s.trim().parse::<f64>().is_ok() => Reading::Number(n),
            _ => Reading::Text(s.trim().to_string()),
        }),
        _ => None,
    })
}

/// Returns the first candidate holding a non-blank string or a number,
/// rendered as text.
pub fn resolve_text(record: &RawRecord, field: &LogicalField) -> Option<Resolved<String>> {
    first_match(record, field, |value| match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn first_match<T>(
    record: &RawRecord,
    field: &LogicalField,
    accept: impl Fn(&Value) -> Option<T>,
) -> Option<Resolved<T>> {
    field.candidates.iter().find_map(|key| {
        record
            .get(*key)
            .and_then(&accept)
            .map(|value| Resolved { key: *key, value })
    })
}
