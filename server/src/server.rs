use percent_encoding::percent_decode_str;
use serde::Serialize;
use serde_json::json;
use shared::models::BuoyRecord;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use warp::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use warp::http::{HeaderMap, HeaderValue, Response, StatusCode};
use warp::hyper::Body;
use warp::reply::Response as ReplyResponse;
use warp::{Filter, Rejection, Reply};

use crate::aggregate::{self, BuoyListing, FeedCache};
use crate::catalog::{INCOIS_PARAMETERS, MOORED_BUOY_IDS};
use crate::config::{config, Config};
use crate::csv_export;
use crate::diagnostics::LogSink;
use crate::error::{reject, Error, ScrapeError};
use crate::feeds::{FeedSource, IncoisClient};
use crate::proxy::{self, Proxy};
use crate::scrape::{self, Scraper};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub feeds: Arc<dyn FeedSource>,
    pub scraper: Scraper,
    pub proxy: Proxy,
    pub feed_cache: Arc<FeedCache>,
}

impl AppState {
    pub fn new(config: &Config, feeds: Arc<dyn FeedSource>) -> anyhow::Result<AppState> {
        Ok(AppState {
            config: Arc::new(config.clone()),
            feeds,
            scraper: Scraper::new(config)?,
            proxy: Proxy::new(config)?,
            feed_cache: Arc::new(FeedCache::new(Duration::from_secs(config.cache_ttl_secs))),
        })
    }
}

pub async fn run(address: std::net::SocketAddr) -> anyhow::Result<()> {
    let config = config();
    let feeds = Arc::new(IncoisClient::new(config)?);
    let state = AppState::new(config, feeds)?;

    log::info!("INCOIS proxy listening on http://{}", address);
    log::info!(
        "{} moored buoys, {} parameters, proxy at /incois-proxy/*",
        MOORED_BUOY_IDS.len(),
        INCOIS_PARAMETERS.len()
    );

    warp::serve(routes(state)).run(address).await;
    Ok(())
}

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let cors = warp::cors()
        .allow_origins(state.config.allowed_origins.iter().map(String::as_str))
        .allow_credentials(true)
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["content-type", "authorization"]);
    let framing = warp::reply::with::headers(framing_headers(&state.config));

    let root_route = warp::path::end().and(warp::get()).map(root);

    let health_route = warp::path!("health").map(|| StatusCode::OK);

    let buoys_route = warp::path!("ocean-buoys")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(ocean_buoys);

    let buoy_route = warp::path!("ocean-buoy" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(ocean_buoy);

    let moored_route = warp::path!("moored" / String / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(moored);

    let url_route = warp::path!("incois-url" / String / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .map(incois_url);

    let csv_route = warp::path!("ocean-data-csv" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(ocean_data_csv);

    let api = root_route
        .or(health_route)
        .or(buoys_route)
        .or(buoy_route)
        .or(moored_route)
        .or(url_route)
        .or(csv_route)
        .with(framing)
        .with(cors);

    proxy::route(state.proxy.clone())
        .or(api)
        .recover(rejection)
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn framing_headers(config: &Config) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-frame-options", HeaderValue::from_static("ALLOWALL"));
    match HeaderValue::from_str(&config.frame_ancestors()) {
        Ok(policy) => {
            headers.insert("content-security-policy", policy);
        }
        Err(e) => log::warn!("Ignoring invalid frame-ancestors policy: {}", e),
    }
    headers
}

/// Path segments arrive percent-encoded, e.g. `Air%20Temperature`.
fn decode_segment(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

async fn current_listing(state: &AppState) -> BuoyListing {
    aggregate::list_buoys(state.feeds.as_ref(), &LogSink, &state.feed_cache).await
}

fn root() -> impl Reply {
    warp::reply::json(&json!({
        "status": "INCOIS Ocean API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "proxy": [
                "ANY /incois-proxy/* - INCOIS pages with framing headers removed",
                "GET /incois-url/{buoyId}/{parameter} - iframe URLs for a chart page"
            ],
            "data": [
                "GET /ocean-buoys - all buoys with summary statistics",
                "GET /ocean-buoy/{id} - one buoy",
                "GET /moored/{buoyId}/{parameter} - scraped chart series or error"
            ],
            "download": [
                "GET /ocean-data-csv/{year} - CSV export"
            ]
        },
        "mooredBuoys": MOORED_BUOY_IDS,
        "availableParameters": INCOIS_PARAMETERS.len(),
        "proxyExample": "/incois-proxy/site/datainfo/moored_omnidata_stock.jsp?buoy=AD06&parameter=Air%20Temperature",
        "realDataExample": "/moored/AD06/Air%20Temperature"
    }))
}

#[derive(Serialize)]
struct Found<'a> {
    success: bool,
    data: &'a BuoyRecord,
}

#[derive(Serialize)]
struct Failure {
    success: bool,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IncoisUrl {
    success: bool,
    buoy_id: String,
    parameter: String,
    proxy_url: String,
    direct_url: String,
    message: &'static str,
}

pub async fn ocean_buoys(state: AppState) -> Result<impl Reply, Rejection> {
    let listing = current_listing(&state).await;
    Ok(warp::reply::json(&listing))
}

pub async fn ocean_buoy(id: String, state: AppState) -> Result<ReplyResponse, Rejection> {
    let id = decode_segment(&id);
    let listing = current_listing(&state).await;
    let reply = match listing.find(&id) {
        Some(record) => warp::reply::json(&Found {
            success: true,
            data: record,
        })
        .into_response(),
        None => warp::reply::with_status(
            warp::reply::json(&Failure {
                success: false,
                message: "Buoy not found".to_string(),
            }),
            StatusCode::NOT_FOUND,
        )
        .into_response(),
    };
    Ok(reply)
}

pub async fn moored(
    buoy_id: String,
    parameter: String,
    state: AppState,
) -> Result<ReplyResponse, Rejection> {
    let buoy_id = decode_segment(&buoy_id);
    let parameter = decode_segment(&parameter);
    log::info!("Moored data request: {} -> {}", buoy_id, parameter);

    match state.scraper.scrape(&buoy_id, &parameter, &LogSink).await {
        Ok(envelope) => {
            log::info!(
                "{}:{} scraped with {} ({} points)",
                buoy_id,
                parameter,
                envelope.extraction_method.label(),
                envelope.extracted_points
            );
            Ok(warp::reply::json(&envelope).into_response())
        }
        Err(err) => {
            log::warn!("{}:{} {}: {}", buoy_id, parameter, err.code(), err);
            Ok(scrape_error_reply(&err))
        }
    }
}

pub fn incois_url(buoy_id: String, parameter: String, state: AppState) -> ReplyResponse {
    let buoy_id = decode_segment(&buoy_id);
    let parameter = decode_segment(&parameter);
    if let Err(err) = scrape::validate(&buoy_id, &parameter) {
        return scrape_error_reply(&err);
    }

    warp::reply::json(&IncoisUrl {
        proxy_url: scrape::proxy_path(&state.config, &buoy_id, &parameter),
        direct_url: scrape::direct_url(&state.config, &buoy_id, &parameter),
        success: true,
        buoy_id,
        parameter,
        message: "Use proxyUrl for iframe embedding.",
    })
    .into_response()
}

pub async fn ocean_data_csv(year: String, state: AppState) -> Result<ReplyResponse, Rejection> {
    let listing = current_listing(&state).await;
    let csv = csv_export::to_csv(&listing.records).map_err(reject)?;
    let filename = csv_export::attachment_name(&decode_segment(&year));

    Response::builder()
        .header(CONTENT_TYPE, HeaderValue::from_static("text/csv"))
        .header(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(csv))
        .map_err(reject)
}

fn scrape_error_reply(err: &ScrapeError) -> ReplyResponse {
    warp::reply::with_status(warp::reply::json(&err.body()), err.status()).into_response()
}

#[derive(Serialize)]
struct ErrorMessage {
    success: bool,
    code: u16,
    message: String,
}

pub async fn rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found.")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.")
    } else if let Some(Error(e)) = err.find::<Error>() {
        log::error!("Error: {:#}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
    } else {
        log::error!("Error: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
    };

    let json = warp::reply::json(&ErrorMessage {
        success: false,
        code: code.as_u16(),
        message: message.into(),
    });

    Ok(warp::reply::with_status(json, code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::testing::StaticSource;
    use serde_json::Value;
    use shared::models::FeedType;

    fn state() -> AppState {
        let config = Config {
            upstream_base: "http://127.0.0.1:9".to_string(),
            scrape_timeout_secs: 2,
            proxy_timeout_secs: 2,
            cache_ttl_secs: 0,
            ..Config::default()
        };
        let source = StaticSource::default().with(
            FeedType::Argo,
            json!([
                { "lat": 15.2, "lon": 88.1, "buoyId": "2902113", "SST": 28.9 },
                { "lat": null, "lon": 88.1 }
            ]),
        );
        AppState::new(&config, Arc::new(source)).unwrap()
    }

    fn body(res: &Response<bytes::Bytes>) -> Value {
        serde_json::from_slice(res.body()).unwrap()
    }

    #[tokio::test]
    async fn test_root_describes_service() {
        let res = warp::test::request().path("/").reply(&routes(state())).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(&res)["mooredBuoys"].as_array().unwrap().len(), 10);
        assert_eq!(body(&res)["availableParameters"], 52);
    }

    #[tokio::test]
    async fn test_health() {
        let res = warp::test::request().path("/health").reply(&routes(state())).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_path_is_json_404() {
        let res = warp::test::request().path("/api/nope").reply(&routes(state())).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&res)["code"], 404);
    }

    #[tokio::test]
    async fn test_moored_invalid_buoy() {
        let res = warp::test::request()
            .path("/moored/XX01/Air%20Temperature")
            .reply(&routes(state()))
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&res)["error"], "INVALID_BUOY_ID");
        assert_eq!(res.headers()["x-frame-options"], "ALLOWALL");
    }

    #[tokio::test]
    async fn test_moored_invalid_parameter() {
        let res = warp::test::request()
            .path("/moored/AD06/Sea%20Monsters")
            .reply(&routes(state()))
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&res)["error"], "INVALID_PARAMETER");
    }

    #[tokio::test]
    async fn test_moored_upstream_failure_is_extraction_error() {
        let res = warp::test::request()
            .path("/moored/AD06/Air%20Temperature")
            .reply(&routes(state()))
            .await;
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        let body = body(&res);
        assert_eq!(body["error"], "EXTRACTION_ERROR");
        assert_eq!(body["parameter"], "Air Temperature");
    }

    #[tokio::test]
    async fn test_incois_url() {
        let res = warp::test::request()
            .path("/incois-url/AD06/Air%20Temperature")
            .reply(&routes(state()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body(&res);
        assert_eq!(
            body["proxyUrl"],
            "/incois-proxy/site/datainfo/moored_omnidata_stock.jsp?buoy=AD06&parameter=Air%20Temperature"
        );
        assert_eq!(
            body["directUrl"],
            "http://127.0.0.1:9/site/datainfo/moored_omnidata_stock.jsp?buoy=AD06&parameter=Air%20Temperature"
        );
    }

    #[tokio::test]
    async fn test_incois_url_invalid_buoy() {
        let res = warp::test::request()
            .path("/incois-url/ZZ00/Air%20Temperature")
            .reply(&routes(state()))
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ocean_buoys_with_failing_feeds() {
        let res = warp::test::request().path("/ocean-buoys").reply(&routes(state())).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()["content-security-policy"],
            "frame-ancestors 'self' http://localhost:3000 http://localhost:3001 http://localhost:5000"
        );
        let body = body(&res);
        assert_eq!(body["success"], true);
        assert_eq!(body["argo"].as_array().unwrap().len(), 1);
        assert_eq!(body["networks"]["ARGO"], 2);
        assert_eq!(body["survivors"]["ARGO"], 1);
        assert_eq!(body["networks"]["MOORED"], 0);
        assert_eq!(body["rama"]["type"], "FeatureCollection");
        assert_eq!(body["stats"]["avgTemperature"], 28.9);
        assert_eq!(body["stats"]["avgSalinity"], Value::Null);
    }

    #[tokio::test]
    async fn test_ocean_buoy_lookup() {
        let filter = routes(state());
        let res = warp::test::request().path("/ocean-buoy/ARGO_001").reply(&filter).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(&res)["data"]["buoyId"], "2902113");

        let res = warp::test::request().path("/ocean-buoy/ARGO_002").reply(&filter).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&res)["message"], "Buoy not found");
    }

    #[tokio::test]
    async fn test_csv_download() {
        let res = warp::test::request()
            .path("/ocean-data-csv/2024")
            .reply(&routes(state()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()["content-disposition"],
            "attachment; filename=\"incois_ocean_data_2024.csv\""
        );
        let text = String::from_utf8(res.body().to_vec()).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_decode_segment() {
        assert_eq!(decode_segment("Current%20Speed%20%40%201.20m"), "Current Speed @ 1.20m");
        assert_eq!(decode_segment("AD06"), "AD06");
    }
}
