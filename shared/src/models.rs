use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Upstream network a record was pulled from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeedType {
    Argo,
    Moored,
    Rama,
    Omni,
}

impl FeedType {
    pub const ALL: [FeedType; 4] = [FeedType::Argo, FeedType::Moored, FeedType::Rama, FeedType::Omni];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedType::Argo => "ARGO",
            FeedType::Moored => "MOORED",
            FeedType::Rama => "RAMA",
            FeedType::Omni => "OMNI",
        }
    }
}

impl fmt::Display for FeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedType {
    type Err = String;

    fn from_str(s: &str) -> Result<FeedType, String> {
        match s.to_ascii_uppercase().as_str() {
            "ARGO" => Ok(FeedType::Argo),
            "MOORED" => Ok(FeedType::Moored),
            "RAMA" => Ok(FeedType::Rama),
            "OMNI" => Ok(FeedType::Omni),
            _ => Err(format!("unknown feed type: {}", s)),
        }
    }
}

/// A single sensor reading as reported upstream.
///
/// Numeric-looking values are stored as numbers, anything else is kept as
/// the provider's text.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Reading {
    Number(f64),
    Text(String),
}

impl Reading {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Reading::Number(n) => Some(*n),
            Reading::Text(_) => None,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Number(n) => write!(f, "{}", n),
            Reading::Text(t) => f.write_str(t),
        }
    }
}

/// Coarse Indian Ocean basin, used by the dashboard for grouping markers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum Region {
    #[serde(rename = "Northern Arabian Sea")]
    NorthernArabianSea,
    #[serde(rename = "Western Arabian Sea")]
    WesternArabianSea,
    #[serde(rename = "Bay of Bengal")]
    BayOfBengal,
    #[serde(rename = "Eastern Bay of Bengal")]
    EasternBayOfBengal,
    #[serde(rename = "Southern Indian Ocean")]
    SouthernIndianOcean,
    #[serde(rename = "Central Indian Ocean")]
    CentralIndianOcean,
}

impl Region {
    /// First matching rule wins, so the Arabian Sea bands take precedence
    /// over the southern hemisphere check.
    pub fn from_coordinates(lat: f64, lon: f64) -> Region {
        if lat > 15.0 && lon < 75.0 {
            Region::NorthernArabianSea
        } else if lat > 10.0 && lon < 75.0 {
            Region::WesternArabianSea
        } else if lat > 10.0 && lon > 85.0 {
            Region::BayOfBengal
        } else if lat <= 10.0 && lon > 85.0 {
            Region::EasternBayOfBengal
        } else if lat < 0.0 {
            Region::SouthernIndianOcean
        } else {
            Region::CentralIndianOcean
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Region::NorthernArabianSea => "Northern Arabian Sea",
            Region::WesternArabianSea => "Western Arabian Sea",
            Region::BayOfBengal => "Bay of Bengal",
            Region::EasternBayOfBengal => "Eastern Bay of Bengal",
            Region::SouthernIndianOcean => "Southern Indian Ocean",
            Region::CentralIndianOcean => "Central Indian Ocean",
        }
    }
}

/// Transmission state of a RAMA mooring.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "state", content = "raw", rename_all = "camelCase")]
pub enum ReportingStatus {
    Reporting,
    NotReporting,
    /// A phrasing we have no mapping for, kept verbatim.
    Unrecognized(String),
}

/// Normalized latest reading of one physical buoy.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuoyRecord {
    pub id: String,
    pub buoy_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub feed_type: FeedType,
    pub region: Region,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporting_status: Option<ReportingStatus>,
    pub parameters: BTreeMap<String, Option<Reading>>,
    pub raw_source: serde_json::Value,
}

impl BuoyRecord {
    pub fn reading(&self, parameter: &str) -> Option<&Reading> {
        self.parameters.get(parameter).and_then(Option::as_ref)
    }

    pub fn has_readings(&self) -> bool {
        self.parameters.values().any(Option::is_some)
    }
}

/// One sample of a scraped chart series.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TimeSeriesPoint {
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        TimeSeriesPoint { timestamp, value }
    }
}
