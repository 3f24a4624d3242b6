use serde::Serialize;
use warp::http::StatusCode;

use crate::catalog::{INCOIS_PARAMETERS, MOORED_BUOY_IDS};
use crate::extract::Strategy;

/// Failures of a moored-buoy scrape, each mapped to a fixed HTTP status and
/// error code.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("Invalid buoy ID: {buoy_id}. Available: {}", MOORED_BUOY_IDS.join(", "))]
    InvalidBuoyId { buoy_id: String },
    #[error("Invalid parameter: {parameter}. Available: {}...", INCOIS_PARAMETERS[..5].join(", "))]
    InvalidParameter { parameter: String },
    #[error("Unable to extract real INCOIS data for {buoy_id}:{parameter}. All extraction methods failed.")]
    NoRealDataAvailable {
        buoy_id: String,
        parameter: String,
        suggestion: String,
    },
    #[error("Error extracting INCOIS data: {cause}")]
    Upstream {
        buoy_id: String,
        parameter: String,
        cause: String,
    },
}

impl ScrapeError {
    pub fn status(&self) -> StatusCode {
        match self {
            ScrapeError::InvalidBuoyId { .. } | ScrapeError::InvalidParameter { .. } => {
                StatusCode::BAD_REQUEST
            }
            ScrapeError::NoRealDataAvailable { .. } => StatusCode::NOT_FOUND,
            ScrapeError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ScrapeError::InvalidBuoyId { .. } => "INVALID_BUOY_ID",
            ScrapeError::InvalidParameter { .. } => "INVALID_PARAMETER",
            ScrapeError::NoRealDataAvailable { .. } => "NO_REAL_DATA_AVAILABLE",
            ScrapeError::Upstream { .. } => "EXTRACTION_ERROR",
        }
    }

    pub fn body(&self) -> ScrapeErrorBody<'_> {
        let mut body = ScrapeErrorBody {
            success: false,
            error: self.code(),
            message: self.to_string(),
            buoy_id: None,
            parameter: None,
            attempted_methods: None,
            suggestion: None,
        };
        match self {
            ScrapeError::InvalidBuoyId { .. } | ScrapeError::InvalidParameter { .. } => {}
            ScrapeError::NoRealDataAvailable {
                buoy_id,
                parameter,
                suggestion,
            } => {
                body.buoy_id = Some(buoy_id.as_str());
                body.parameter = Some(parameter.as_str());
                body.attempted_methods = Some(Strategy::ALL.to_vec());
                body.suggestion = Some(suggestion.as_str());
            }
            ScrapeError::Upstream {
                buoy_id, parameter, ..
            } => {
                body.buoy_id = Some(buoy_id.as_str());
                body.parameter = Some(parameter.as_str());
            }
        }
        body
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeErrorBody<'a> {
    pub success: bool,
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buoy_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempted_methods: Option<Vec<Strategy>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<&'a str>,
}

/// Internal failure carried through a warp rejection.
#[derive(Debug)]
pub struct Error(pub anyhow::Error);
impl warp::reject::Reject for Error {}

pub fn reject<E: Into<anyhow::Error>>(err: E) -> warp::Rejection {
    warp::reject::custom(Error(err.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invalid_buoy_body() {
        let err = ScrapeError::InvalidBuoyId {
            buoy_id: "XX01".to_string(),
        };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"], json!("INVALID_BUOY_ID"));
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid buoy ID: XX01. Available: AD06, AD07"));
        assert!(body.get("buoyId").is_none());
    }

    #[test]
    fn test_invalid_parameter_message_lists_first_five() {
        let err = ScrapeError::InvalidParameter {
            parameter: "Foo".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid parameter: Foo. Available: Air Pressure, Air Temperature, Relative Humidity, Rainfall, Wind Direction..."
        );
    }

    #[test]
    fn test_no_real_data_body_lists_all_strategies() {
        let err = ScrapeError::NoRealDataAvailable {
            buoy_id: "AD06".to_string(),
            parameter: "Air Temperature".to_string(),
            suggestion: "Use the proxy".to_string(),
        };
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(body["error"], json!("NO_REAL_DATA_AVAILABLE"));
        assert_eq!(body["buoyId"], json!("AD06"));
        assert_eq!(
            body["attemptedMethods"],
            json!(["Highcharts", "Dygraph", "HTML Table", "JSON Script", "Hidden Elements"])
        );
        assert_eq!(body["suggestion"], json!("Use the proxy"));
    }

    #[test]
    fn test_upstream_failure_is_bad_gateway() {
        let err = ScrapeError::Upstream {
            buoy_id: "AD06".to_string(),
            parameter: "Air Temperature".to_string(),
            cause: "connection refused".to_string(),
        };
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code(), "EXTRACTION_ERROR");
        assert_eq!(err.to_string(), "Error extracting INCOIS data: connection refused");
    }
}
