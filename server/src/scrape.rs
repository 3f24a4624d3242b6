//! Moored-buoy chart scraping.
//!
//! A `(buoy, parameter)` request is validated against the catalog, the
//! upstream chart page is fetched once and the extraction cascade runs over
//! it. No synthetic data is ever returned.

use anyhow::Context;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use scraper::Html;
use serde::Serialize;
use shared::models::TimeSeriesPoint;
use std::time::Duration;

use crate::catalog;
use crate::config::Config;
use crate::diagnostics::DiagnosticSink;
use crate::error::ScrapeError;
use crate::extract::{self, Strategy};

pub const SOURCE_LABEL: &str = "INCOIS Live Data";

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Characters left alone by JavaScript's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Clone, Debug, PartialEq)]
pub enum ScrapeResult {
    Success {
        points: Vec<TimeSeriesPoint>,
        extraction_method: Strategy,
        source_label: &'static str,
    },
    NotFound,
}

/// Body returned for a successful scrape.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeEnvelope {
    pub success: bool,
    pub data: Vec<TimeSeriesPoint>,
    pub is_real: bool,
    pub source: &'static str,
    pub extraction_method: Strategy,
    pub buoy_id: String,
    pub parameter: String,
    pub extracted_points: usize,
}

pub fn validate(buoy_id: &str, parameter: &str) -> Result<(), ScrapeError> {
    if !catalog::is_known_buoy(buoy_id) {
        return Err(ScrapeError::InvalidBuoyId {
            buoy_id: buoy_id.to_string(),
        });
    }
    if !catalog::is_known_parameter(parameter) {
        return Err(ScrapeError::InvalidParameter {
            parameter: parameter.to_string(),
        });
    }
    Ok(())
}

pub fn encode_component(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT).to_string()
}

fn chart_query(buoy_id: &str, parameter: &str) -> String {
    format!(
        "buoy={}&parameter={}",
        encode_component(buoy_id),
        encode_component(parameter)
    )
}

/// Chart page path through this server's reverse proxy.
pub fn proxy_path(config: &Config, buoy_id: &str, parameter: &str) -> String {
    format!(
        "/incois-proxy{}?{}",
        config.moored_data_path,
        chart_query(buoy_id, parameter)
    )
}

/// Chart page URL on the upstream host.
pub fn direct_url(config: &Config, buoy_id: &str, parameter: &str) -> String {
    format!("{}?{}", config.moored_data_url(), chart_query(buoy_id, parameter))
}

/// Parses `html` and runs the extraction cascade over it.
pub fn scrape_document(html: &str, sink: &dyn DiagnosticSink) -> ScrapeResult {
    let document = Html::parse_document(html);
    match extract::run_cascade(&document, sink) {
        Some(extraction) => ScrapeResult::Success {
            points: extraction.points,
            extraction_method: extraction.strategy,
            source_label: SOURCE_LABEL,
        },
        None => ScrapeResult::NotFound,
    }
}

/// Wraps a cascade outcome for a validated request.
pub fn into_envelope(
    result: ScrapeResult,
    config: &Config,
    buoy_id: &str,
    parameter: &str,
) -> Result<ScrapeEnvelope, ScrapeError> {
    match result {
        ScrapeResult::Success {
            points,
            extraction_method,
            source_label,
        } => Ok(ScrapeEnvelope {
            success: true,
            extracted_points: points.len(),
            data: points,
            is_real: true,
            source: source_label,
            extraction_method,
            buoy_id: buoy_id.to_string(),
            parameter: parameter.to_string(),
        }),
        ScrapeResult::NotFound => Err(ScrapeError::NoRealDataAvailable {
            buoy_id: buoy_id.to_string(),
            parameter: parameter.to_string(),
            suggestion: format!(
                "Use the proxy endpoint instead: {}",
                proxy_path(config, buoy_id, parameter)
            ),
        }),
    }
}

#[derive(Clone)]
pub struct Scraper {
    client: reqwest::Client,
    config: Config,
}

impl Scraper {
    pub fn new(config: &Config) -> anyhow::Result<Scraper> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.scrape_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build scrape HTTP client")?;
        Ok(Scraper {
            client,
            config: config.clone(),
        })
    }

    pub async fn scrape(
        &self,
        buoy_id: &str,
        parameter: &str,
        sink: &dyn DiagnosticSink,
    ) -> Result<ScrapeEnvelope, ScrapeError> {
        validate(buoy_id, parameter)?;

        let html = self
            .fetch_page(buoy_id, parameter)
            .await
            .map_err(|e| ScrapeError::Upstream {
                buoy_id: buoy_id.to_string(),
                parameter: parameter.to_string(),
                cause: format!("{:#}", e),
            })?;

        // The parsed document is not Send; keep it out of any await.
        let result = scrape_document(&html, sink);
        into_envelope(result, &self.config, buoy_id, parameter)
    }

    async fn fetch_page(&self, buoy_id: &str, parameter: &str) -> anyhow::Result<String> {
        let url = direct_url(&self.config, buoy_id, parameter);
        log::info!("Scraping {} {} from {}", buoy_id, parameter, url);

        let resp = self
            .client
            .get(&url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Referer", format!("{}/", self.config.upstream_base.trim_end_matches('/')))
            .send()
            .await
            .with_context(|| format!("Failed to request {}", url))?
            .error_for_status()
            .with_context(|| format!("Upstream refused {}", url))?;

        resp.text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))
    }
}
